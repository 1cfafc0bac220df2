//! GeminiClient -- concrete [`GenerativeClient`] for the Gemini API.
//!
//! Sends non-streaming `generateContent` requests. The API key is
//! resolved through the [`KeyChain`] on every call, so a key stored by
//! the key selection flow takes effect on the very next request without
//! rebuilding the client. The key is only exposed while building the
//! request header; it never appears in logs.
//!
//! [`GenerativeClient`]: unloop_core::client::GenerativeClient

use std::time::Duration;

use secrecy::ExposeSecret;

use unloop_core::client::GenerativeClient;
use unloop_types::llm::{GenerationRequest, GenerationResponse, LlmError, Usage};

use crate::keys::KeyChain;

use super::types::{
    GeminiContent, GeminiErrorEnvelope, GeminiGenerationConfig, GeminiRequest, GeminiResponse,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini generative model client.
pub struct GeminiClient {
    client: reqwest::Client,
    keys: KeyChain,
    base_url: String,
}

// No Debug derive: the resolved key must never reach log output.

impl GeminiClient {
    pub fn new(keys: KeyChain) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            keys,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL, for tests and proxies.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, model
        )
    }

    fn to_gemini_request(request: &GenerationRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|m| GeminiContent::from_text(m.role, m.content.clone()))
            .collect();

        let response_mime_type = request
            .response_schema
            .as_ref()
            .map(|_| "application/json".to_string());

        GeminiRequest {
            contents,
            system_instruction: request.system.clone().map(GeminiContent::system),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type,
                response_schema: request.response_schema.clone(),
            },
        }
    }

    /// Map a non-success response to the error classification the retry
    /// executor understands.
    ///
    /// Gemini signals problems three ways: the HTTP status, a canonical
    /// status string in the error envelope, and sometimes only the message
    /// text. All three are consulted; notably an invalid key arrives as
    /// HTTP 400 with `API_KEY_INVALID` in the body. Rate limits carry the
    /// server's suggested wait (`Retry-After` header or a `RetryInfo`
    /// detail block) through to the executor.
    fn classify_failure(
        status: reqwest::StatusCode,
        retry_after: Option<&str>,
        body: &str,
    ) -> LlmError {
        let envelope: Option<GeminiErrorEnvelope> = serde_json::from_str(body).ok();
        let (canonical, message) = match &envelope {
            Some(env) => (env.error.status.as_str(), env.error.message.as_str()),
            None => ("", body),
        };
        let retry_after_ms = suggested_retry_ms(retry_after, envelope.as_ref());

        if canonical == "RESOURCE_EXHAUSTED" || message.contains("RESOURCE_EXHAUSTED") {
            return LlmError::RateLimited { retry_after_ms };
        }
        if canonical == "UNAVAILABLE"
            || message.contains("UNAVAILABLE")
            || message.to_lowercase().contains("overloaded")
        {
            return LlmError::Overloaded(message.to_string());
        }
        if message.contains("API_KEY_INVALID") || message.contains("API key") {
            return LlmError::AuthenticationFailed;
        }

        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited { retry_after_ms },
            503 => LlmError::Overloaded(message.to_string()),
            code => LlmError::Provider {
                message: format!("HTTP {code}: {message}"),
            },
        }
    }
}

/// The server's suggested retry delay: the `Retry-After` header (whole
/// seconds) when present, otherwise a `google.rpc.RetryInfo` detail block
/// in the error envelope (`retryDelay`, a proto duration like `"7s"`).
fn suggested_retry_ms(
    retry_after: Option<&str>,
    envelope: Option<&GeminiErrorEnvelope>,
) -> Option<u64> {
    if let Some(secs) = retry_after.and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(secs.saturating_mul(1000));
    }
    envelope?.error.details.iter().find_map(|detail| {
        let is_retry_info = detail
            .get("@type")
            .and_then(|t| t.as_str())
            .is_some_and(|t| t.ends_with("RetryInfo"));
        if !is_retry_info {
            return None;
        }
        parse_proto_duration_ms(detail.get("retryDelay")?.as_str()?)
    })
}

fn parse_proto_duration_ms(value: &str) -> Option<u64> {
    let secs: f64 = value.strip_suffix('s')?.trim().parse().ok()?;
    (secs >= 0.0).then(|| (secs * 1000.0) as u64)
}

impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        // No key anywhere in the chain is the same failure as a rejected
        // key; both route the user to key selection.
        let api_key = self
            .keys
            .resolve()
            .await
            .ok_or(LlmError::AuthenticationFailed)?;

        let body = Self::to_gemini_request(request);
        let url = self.url(&request.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(
                status,
                retry_after.as_deref(),
                &error_body,
            ));
        }

        let gemini_resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let text = gemini_resp
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(GeminiContent::joined_text)
            .ok_or_else(|| {
                LlmError::Deserialization("response carried no candidate content".to_string())
            })?;

        Ok(GenerationResponse {
            text,
            usage: Usage {
                input_tokens: gemini_resp.usage_metadata.prompt_token_count,
                output_tokens: gemini_resp.usage_metadata.candidates_token_count,
            },
        })
    }
}
