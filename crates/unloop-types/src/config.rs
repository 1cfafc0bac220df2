//! Application configuration types for Unloop.
//!
//! `AppConfig` represents the top-level `config.toml` in the data
//! directory. All fields have defaults so a missing or partial file
//! still yields a working configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration for Unloop.
///
/// Loaded from `~/.unloop/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model identifier for all three gateway operations.
    #[serde(default = "default_model")]
    pub model: String,

    /// Output token ceiling per generation.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature for open dialogue turns.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Retry behavior for transient provider errors.
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Bounds for the retrying request executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts before the last transient error propagates.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds; doubles per attempt.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_attempts() -> u32 {
    6
}

fn default_initial_delay_ms() -> u64 {
    2000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.initial_delay_ms, 2000);
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.max_output_tokens, 2048);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
model = "gemini-2.5-pro"

[retry]
max_attempts = 3
"#,
        )
        .unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.retry.max_attempts, 3);
        // Unset retry field still defaults
        assert_eq!(config.retry.initial_delay_ms, 2000);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = AppConfig {
            model: "gemini-2.5-pro".to_string(),
            max_output_tokens: 4096,
            temperature: 0.4,
            retry: RetrySettings {
                max_attempts: 4,
                initial_delay_ms: 500,
            },
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_output_tokens, 4096);
        assert_eq!(parsed.retry.max_attempts, 4);
    }
}
