//! Retrying request executor with exponential backoff.
//!
//! Wraps an arbitrary asynchronous operation and retries it on the
//! transient error class (rate limited / overloaded), sleeping
//! `initial_delay * 2^attempt` between attempts. A rate limit that
//! carries a server-suggested wait sleeps that long instead. Non-transient
//! errors propagate immediately after a single attempt. Distinct calls are
//! fully independent: there is no shared rate-limit state across
//! executions.

use std::time::Duration;

use unloop_types::config::RetrySettings;
use unloop_types::llm::LlmError;

/// Bounds for one execution of the retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts; zero is clamped to a single attempt.
    pub max_attempts: u32,
    /// First backoff delay; doubles on every subsequent transient failure.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from the user's configured retry settings.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
        }
    }

    /// Backoff delay for a 0-based attempt index: `initial * 2^attempt`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `op` under the given policy, returning its first success.
///
/// Transient errors (`LlmError::is_transient`) trigger a backoff sleep and
/// a retry, up to `max_attempts` total attempts; the last transient error
/// propagates once the budget is exhausted. Any other error propagates
/// immediately without a retry. The caller's task suspends for the sleep
/// duration; nothing about this call retries concurrently.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                let delay = suggested_delay(&err).unwrap_or_else(|| policy.delay_for(attempt));
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient provider error, backing off"
                );
                tokio::time::sleep(delay).await;
                last_error = Some(err);
            }
            Err(err) => {
                tracing::debug!(error = %err, "Non-transient provider error, not retrying");
                return Err(err);
            }
        }
    }

    Err(last_error.unwrap_or(LlmError::Provider {
        message: "retry budget exhausted without an attempt".to_string(),
    }))
}

/// The wait the provider asked for, when it named one.
fn suggested_delay(err: &LlmError) -> Option<Duration> {
    match err {
        LlmError::RateLimited {
            retry_after_ms: Some(ms),
        } => Some(Duration::from_millis(*ms)),
        _ => None,
    }
}
