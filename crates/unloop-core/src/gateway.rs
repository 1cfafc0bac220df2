//! AI gateway: the three model operations behind the reflection flow.
//!
//! A thin façade over a [`GenerativeClient`]: open dialogue turns, best-
//! effort keyword extraction, and schema-constrained snapshot generation.
//! Every operation builds a fresh request, routes through the retrying
//! executor, and returns a tagged [`GatewayError`] so the flow controller
//! switches on classified outcomes instead of raw error shapes.
//!
//! The gateway mutates no local state; its only side effect is the
//! network call itself.

use tokio_util::sync::CancellationToken;

use unloop_types::config::AppConfig;
use unloop_types::llm::{GenerationMessage, GenerationRequest, LlmError};
use unloop_types::snapshot::LifeSnapshot;
use unloop_types::turn::{ConversationTurn, TurnRole};

use crate::client::GenerativeClient;
use crate::retry::{RetryPolicy, run_with_retry};

/// Marker the model is instructed to emit instead of a reply when the
/// user's message signals acute distress. A reply containing it is never
/// rendered; the flow shows the crisis notice instead.
pub const SAFETY_ESCALATION_MARKER: &str = "[SAFETY_ESCALATION]";

/// Inputs shorter than this (trimmed) skip keyword extraction entirely --
/// a request for "ok" or "yes" would be wasted.
pub const MIN_KEYWORD_INPUT_LEN: usize = 12;

/// Attempt budget for the best-effort keyword call.
const KEYWORD_RETRY_ATTEMPTS: u32 = 3;

/// System instruction for open dialogue turns.
const DIALOGUE_SYSTEM_PROMPT: &str = r#"You are Unloop, a warm, grounded reflection companion. You help the user examine what feels stuck in their life through short, curious questions. One question at a time. Never give advice unless asked. Keep replies under 80 words.

If the user expresses intent to harm themselves or others, respond with exactly the text [SAFETY_ESCALATION] and nothing else."#;

/// System instruction for the keyword extraction call.
const KEYWORD_SYSTEM_PROMPT: &str = "Extract 3-5 emotional keywords from the user's message. Return ONLY the keywords, comma-separated, lowercase, nothing else.";

/// System instruction for the snapshot generation call.
const SNAPSHOT_SYSTEM_PROMPT: &str = r#"You are a reflection analyst. From the conversation transcript, produce a life snapshot: the primary theme, the single bottleneck holding the user back, a matrix of recurring behaviors with their frequency, an energy balance (drains and gains scored 1-10 with a short description), and one low-effort action for the coming week. Ground every field in what the user actually said."#;

/// A dialogue turn's outcome: either text to render, or the crisis signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// The model's reply, trimmed, safe to render.
    Text(String),
    /// The reply carried the safety-escalation marker; it must not be
    /// shown. The flow interrupts with a crisis notice instead.
    SafetyEscalation,
}

/// Classified outcome of a gateway operation.
///
/// The flow controller routes on these tags: `AuthRequired` and
/// `Transient` both send the user to key selection (quota exhaustion is
/// treated as "not authorized"), `Hard` degrades per call site.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("API key missing or rejected")]
    AuthRequired,

    #[error("service unavailable after retries")]
    Transient(#[source] LlmError),

    #[error("request failed")]
    Hard(#[source] LlmError),

    #[error("session cancelled while request was in flight")]
    Cancelled,
}

impl GatewayError {
    /// Classify an executor error into a routing tag.
    ///
    /// A transient error reaching this point has already exhausted its
    /// retry budget.
    fn classify(err: LlmError) -> Self {
        match err {
            LlmError::AuthenticationFailed => GatewayError::AuthRequired,
            err if err.is_transient() => GatewayError::Transient(err),
            err => GatewayError::Hard(err),
        }
    }

    /// Whether the flow should reroute to key selection.
    pub fn needs_key_selection(&self) -> bool {
        matches!(self, GatewayError::AuthRequired | GatewayError::Transient(_))
    }
}

/// Façade issuing the three model operations of the reflection flow.
///
/// Generic over the client so tests inject mocks and the binary injects
/// the Gemini implementation.
pub struct AiGateway<C: GenerativeClient> {
    client: C,
    model: String,
    max_output_tokens: u32,
    temperature: f64,
    policy: RetryPolicy,
}

impl<C: GenerativeClient> AiGateway<C> {
    /// Create a gateway from the application configuration.
    pub fn new(client: C, config: &AppConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            policy: RetryPolicy::from_settings(&config.retry),
        }
    }

    /// Send one dialogue turn: the running history plus the new user text.
    ///
    /// Routes through the executor with the default policy. The reply is
    /// scanned for the safety-escalation marker before it is returned.
    #[tracing::instrument(name = "send_turn", skip(self, cancel, history, text), fields(history_len = history.len()))]
    pub async fn send_turn(
        &self,
        cancel: &CancellationToken,
        history: &[ConversationTurn],
        text: &str,
    ) -> Result<TurnReply, GatewayError> {
        let mut messages: Vec<GenerationMessage> =
            history.iter().map(GenerationMessage::from).collect();
        messages.push(GenerationMessage {
            role: TurnRole::User,
            content: text.to_string(),
        });

        let request = GenerationRequest {
            model: self.model.clone(),
            messages,
            system: Some(DIALOGUE_SYSTEM_PROMPT.to_string()),
            max_output_tokens: self.max_output_tokens,
            temperature: Some(self.temperature),
            response_schema: None,
        };

        let text = self.execute(cancel, &self.policy, &request).await?;
        if text.contains(SAFETY_ESCALATION_MARKER) {
            tracing::warn!("Safety escalation marker in model reply");
            return Ok(TurnReply::SafetyEscalation);
        }
        Ok(TurnReply::Text(text.trim().to_string()))
    }

    /// Extract 3-5 emotional keywords from a user message, best-effort.
    ///
    /// Short inputs return empty without a request. Uses a reduced retry
    /// budget; every failure fails soft to an empty sequence -- this call
    /// enriches the UI, nothing downstream depends on it.
    #[tracing::instrument(name = "extract_keywords", skip(self, cancel, text), fields(input_len = text.len()))]
    pub async fn extract_keywords(&self, cancel: &CancellationToken, text: &str) -> Vec<String> {
        if text.trim().len() < MIN_KEYWORD_INPUT_LEN {
            return Vec::new();
        }

        let request = GenerationRequest {
            model: self.model.clone(),
            messages: vec![GenerationMessage {
                role: TurnRole::User,
                content: text.to_string(),
            }],
            system: Some(KEYWORD_SYSTEM_PROMPT.to_string()),
            max_output_tokens: 64,
            temperature: Some(0.2),
            response_schema: None,
        };

        let policy = RetryPolicy {
            max_attempts: KEYWORD_RETRY_ATTEMPTS,
            ..self.policy.clone()
        };

        match self.execute(cancel, &policy, &request).await {
            Ok(reply) => parse_keywords(&reply),
            Err(err) => {
                tracing::warn!(error = %err, "Keyword extraction failed; returning empty");
                Vec::new()
            }
        }
    }

    /// Generate the life snapshot from the full transcript.
    ///
    /// The request is constrained to the `LifeSnapshot` JSON schema and
    /// decoded strictly: a missing or malformed payload is a hard failure,
    /// because every stage past Discovery requires a snapshot.
    #[tracing::instrument(name = "generate_snapshot", skip(self, cancel, history), fields(turns = history.len()))]
    pub async fn generate_snapshot(
        &self,
        cancel: &CancellationToken,
        history: &[ConversationTurn],
    ) -> Result<LifeSnapshot, GatewayError> {
        if history.is_empty() {
            return Err(GatewayError::Hard(LlmError::InvalidRequest(
                "cannot summarize an empty conversation".to_string(),
            )));
        }

        let transcript = history
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");

        let schema = serde_json::to_value(schemars::schema_for!(LifeSnapshot))
            .map_err(|e| GatewayError::Hard(LlmError::Deserialization(e.to_string())))?;

        let request = GenerationRequest {
            model: self.model.clone(),
            messages: vec![GenerationMessage {
                role: TurnRole::User,
                content: transcript,
            }],
            system: Some(SNAPSHOT_SYSTEM_PROMPT.to_string()),
            max_output_tokens: self.max_output_tokens,
            temperature: Some(0.3),
            response_schema: Some(schema),
        };

        let text = self.execute(cancel, &self.policy, &request).await?;
        let snapshot: LifeSnapshot = serde_json::from_str(text.trim()).map_err(|e| {
            GatewayError::Hard(LlmError::Deserialization(format!(
                "snapshot payload did not match schema: {e}"
            )))
        })?;
        Ok(snapshot.normalized())
    }

    /// Run one request through the executor, honoring cancellation.
    ///
    /// A cancelled token discards the result even if the request itself
    /// completed -- late completions must never reach the workspace of a
    /// session the user already left.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        policy: &RetryPolicy,
        request: &GenerationRequest,
    ) -> Result<String, GatewayError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = run_with_retry(policy, || self.client.generate(request)) => result,
        };
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        result
            .map(|response| response.text)
            .map_err(GatewayError::classify)
    }
}

/// Parse a comma-separated keyword reply into a deduplicated,
/// order-preserving sequence: tokens trimmed, empties dropped, duplicates
/// compared case-insensitively with the first-seen form kept.
pub fn parse_keywords(reply: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut keywords = Vec::new();
    for token in reply.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let folded = token.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        keywords.push(token.to_string());
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use unloop_types::llm::{GenerationResponse, Usage};

    // --- Mock client ---

    /// Scripted client: pops one result per call and counts invocations.
    struct MockClient {
        script: Mutex<VecDeque<Result<String, MockError>>>,
        calls: AtomicU32,
    }

    #[derive(Clone)]
    enum MockError {
        RateLimited,
        Auth,
        Provider(String),
    }

    impl MockClient {
        fn replying(replies: &[&str]) -> Self {
            Self {
                script: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn failing(error: MockError, times: usize) -> Self {
            Self {
                script: Mutex::new((0..times).map(|_| Err(error.clone())).collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GenerativeClient for MockClient {
        fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> impl std::future::Future<Output = Result<GenerationResponse, LlmError>> + Send
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            async move {
                match next {
                    Some(Ok(text)) => Ok(GenerationResponse {
                        text,
                        usage: Usage::default(),
                    }),
                    Some(Err(MockError::RateLimited)) => Err(LlmError::RateLimited {
                        retry_after_ms: None,
                    }),
                    Some(Err(MockError::Auth)) => Err(LlmError::AuthenticationFailed),
                    Some(Err(MockError::Provider(msg))) => {
                        Err(LlmError::Provider { message: msg })
                    }
                    None => panic!("mock script exhausted"),
                }
            }
        }
    }

    fn gateway(client: MockClient) -> AiGateway<MockClient> {
        let mut config = AppConfig::default();
        // Keep test backoffs short; timing itself is covered in retry.rs.
        config.retry.initial_delay_ms = 1;
        AiGateway::new(client, &config)
    }

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 {
                    TurnRole::User
                } else {
                    TurnRole::Model
                };
                ConversationTurn::new(role, format!("turn {i}"))
            })
            .collect()
    }

    fn snapshot_json() -> String {
        serde_json::json!({
            "primary_theme": "Career stagnation",
            "the_bottleneck": "Fear of change",
            "pattern_matrix": [
                {"behavior": "Sunday dread", "frequency": "High"}
            ],
            "energy_balance": {"drains": 12, "gains": 3, "description": "lopsided"},
            "low_effort_action": "List three roles"
        })
        .to_string()
    }

    // --- send_turn ---

    #[tokio::test]
    async fn test_send_turn_returns_trimmed_reply() {
        let gw = gateway(MockClient::replying(&["  What does stuck feel like?  "]));
        let cancel = CancellationToken::new();

        let reply = gw
            .send_turn(&cancel, &turns(2), "I feel stuck at work")
            .await
            .unwrap();
        assert_eq!(
            reply,
            TurnReply::Text("What does stuck feel like?".to_string())
        );
        assert_eq!(gw.client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_send_turn_detects_safety_marker() {
        let gw = gateway(MockClient::replying(&["[SAFETY_ESCALATION]"]));
        let cancel = CancellationToken::new();

        let reply = gw
            .send_turn(&cancel, &[], "dark message")
            .await
            .unwrap();
        assert_eq!(reply, TurnReply::SafetyEscalation);
    }

    #[tokio::test]
    async fn test_send_turn_auth_error_tags_auth_required() {
        let gw = gateway(MockClient::failing(MockError::Auth, 1));
        let cancel = CancellationToken::new();

        let err = gw.send_turn(&cancel, &[], "hello there").await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthRequired));
        assert!(err.needs_key_selection());
        assert_eq!(gw.client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_turn_exhausted_rate_limit_tags_transient() {
        let gw = gateway(MockClient::failing(MockError::RateLimited, 6));
        let cancel = CancellationToken::new();

        let err = gw.send_turn(&cancel, &[], "hello there").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));
        assert!(err.needs_key_selection());
        assert_eq!(gw.client.call_count(), 6);
    }

    #[tokio::test]
    async fn test_send_turn_hard_error_not_rerouted() {
        let gw = gateway(MockClient::failing(
            MockError::Provider("500".to_string()),
            1,
        ));
        let cancel = CancellationToken::new();

        let err = gw.send_turn(&cancel, &[], "hello there").await.unwrap_err();
        assert!(matches!(err, GatewayError::Hard(_)));
        assert!(!err.needs_key_selection());
    }

    #[tokio::test]
    async fn test_send_turn_cancelled_token_discards() {
        let gw = gateway(MockClient::replying(&["never seen"]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gw.send_turn(&cancel, &[], "hello there").await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
        assert_eq!(gw.client.call_count(), 0);
    }

    // --- extract_keywords ---

    #[tokio::test]
    async fn test_keywords_short_input_skips_request() {
        let gw = gateway(MockClient::replying(&["never called"]));
        let cancel = CancellationToken::new();

        let keywords = gw.extract_keywords(&cancel, "ok").await;
        assert!(keywords.is_empty());
        assert_eq!(gw.client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_keywords_parse_dedupe_preserves_order() {
        let gw = gateway(MockClient::replying(&["calm, tired , tired,focus"]));
        let cancel = CancellationToken::new();

        let keywords = gw
            .extract_keywords(&cancel, "long enough input text")
            .await;
        assert_eq!(keywords, vec!["calm", "tired", "focus"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keywords_fail_soft_on_exhaustion() {
        // Reduced budget: exactly 3 attempts, then an empty result.
        let gw = gateway(MockClient::failing(MockError::RateLimited, 3));
        let cancel = CancellationToken::new();

        let keywords = gw
            .extract_keywords(&cancel, "long enough input text")
            .await;
        assert!(keywords.is_empty());
        assert_eq!(gw.client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_keywords_fail_soft_on_hard_error() {
        let gw = gateway(MockClient::failing(
            MockError::Provider("boom".to_string()),
            1,
        ));
        let cancel = CancellationToken::new();

        let keywords = gw
            .extract_keywords(&cancel, "long enough input text")
            .await;
        assert!(keywords.is_empty());
        assert_eq!(gw.client.call_count(), 1);
    }

    #[test]
    fn test_parse_keywords_drops_empty_tokens() {
        assert_eq!(parse_keywords("a,,b, ,c"), vec!["a", "b", "c"]);
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(" , ,").is_empty());
    }

    #[test]
    fn test_parse_keywords_case_insensitive_dedupe_keeps_first_form() {
        assert_eq!(parse_keywords("Calm, calm, CALM, tense"), vec!["Calm", "tense"]);
    }

    // --- generate_snapshot ---

    #[tokio::test]
    async fn test_snapshot_decodes_and_clamps() {
        let json = snapshot_json();
        let gw = gateway(MockClient::replying(&[&json]));
        let cancel = CancellationToken::new();

        let snapshot = gw.generate_snapshot(&cancel, &turns(5)).await.unwrap();
        assert_eq!(snapshot.primary_theme, "Career stagnation");
        // drains 12 clamped into range
        assert_eq!(snapshot.energy_balance.drains, 10);
    }

    #[tokio::test]
    async fn test_snapshot_malformed_payload_is_hard_error() {
        let gw = gateway(MockClient::replying(&["not json at all"]));
        let cancel = CancellationToken::new();

        let err = gw.generate_snapshot(&cancel, &turns(4)).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Hard(LlmError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_empty_history_rejected_without_request() {
        let gw = gateway(MockClient::replying(&["unused"]));
        let cancel = CancellationToken::new();

        let err = gw.generate_snapshot(&cancel, &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Hard(_)));
        assert_eq!(gw.client.call_count(), 0);
    }
}
