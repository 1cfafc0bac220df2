//! Wire types for the Gemini `generateContent` endpoint.
//!
//! Field names follow the API's camelCase JSON exactly; everything
//! optional on the wire is optional here so responses from older or
//! newer API revisions keep decoding.

use serde::{Deserialize, Serialize};

use unloop_types::turn::TurnRole;

/// One text part of a content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

/// One content block: a role plus its parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub fn from_text(role: TurnRole, text: impl Into<String>) -> Self {
        // Gemini knows exactly two conversation roles.
        let role = match role {
            TurnRole::Model => "model",
            TurnRole::User | TurnRole::System => "user",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart { text: text.into() }],
        }
    }

    /// A roleless block, used for the system instruction.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![GeminiPart { text: text.into() }],
        }
    }

    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Per-request generation parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_output_tokens: u32,
    /// `application/json` when a response schema is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
}

/// One generated candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token accounting attached to a response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

/// Response body for a successful `generateContent` call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: GeminiUsageMetadata,
}

/// The error envelope Gemini wraps failures in.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorEnvelope {
    pub error: GeminiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    /// Canonical status, e.g. `RESOURCE_EXHAUSTED` or `UNAVAILABLE`.
    #[serde(default)]
    pub status: String,
    /// Structured detail blocks; a `google.rpc.RetryInfo` entry here
    /// carries the server's suggested retry delay.
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GeminiRequest {
            contents: vec![GeminiContent::from_text(TurnRole::User, "hello")],
            system_instruction: Some(GeminiContent::system("be brief")),
            generation_config: GeminiGenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: 2048,
                response_mime_type: None,
                response_schema: None,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert!(json["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_system_role_maps_to_user_content() {
        let content = GeminiContent::from_text(TurnRole::System, "note");
        assert_eq!(content.role.as_deref(), Some("user"));
    }

    #[test]
    fn test_response_decodes_candidates_and_usage() {
        let json = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]}, "finishReason": "STOP"}
            ],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let candidate = &response.candidates[0];
        assert_eq!(candidate.content.as_ref().unwrap().joined_text(), "Hi there");
        assert_eq!(response.usage_metadata.prompt_token_count, 10);
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(response.candidates.is_empty());
        assert_eq!(response.usage_metadata.candidates_token_count, 0);
    }

    #[test]
    fn test_error_envelope_decodes() {
        let json = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let envelope: GeminiErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.code, 429);
        assert_eq!(envelope.error.status, "RESOURCE_EXHAUSTED");
        assert!(envelope.error.details.is_empty());
    }

    #[test]
    fn test_error_envelope_keeps_detail_blocks() {
        let json = r#"{"error": {
            "code": 429,
            "message": "Quota exceeded",
            "status": "RESOURCE_EXHAUSTED",
            "details": [
                {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "7s"}
            ]
        }}"#;
        let envelope: GeminiErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.details.len(), 1);
        assert_eq!(envelope.error.details[0]["retryDelay"], "7s");
    }
}
