//! Generative model request/response types for Unloop.
//!
//! These types are provider-agnostic: the Gemini wire format lives in
//! unloop-infra. Errors carry enough classification for the retry executor
//! to decide transient-vs-terminal without inspecting raw error shapes.

use serde::{Deserialize, Serialize};

use crate::turn::{ConversationTurn, TurnRole};

/// A single message sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMessage {
    pub role: TurnRole,
    pub content: String,
}

impl From<&ConversationTurn> for GenerationMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Request to the generative model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<GenerationMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// When present, constrains the response to JSON matching this schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// Response from the generative model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: Usage,
}

/// Token usage for a single generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Errors from generative model operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Whether the retry executor may retry this error.
    ///
    /// Exactly the rate-limit / overload class; everything else propagates
    /// after a single attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::Overloaded(_)
        )
    }
}
