//! Configuration domain model.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Stream consumption configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// Endpoint fallback configuration
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Outer retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stream consumption configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Overall wall-clock timeout for one streamed invocation, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Interval at which the consumer checks the timeout, in seconds
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

const fn default_timeout_seconds() -> u64 {
    600
}

const fn default_poll_interval_seconds() -> u64 {
    5
}

impl StreamConfig {
    /// Timeout as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

/// Endpoint fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FallbackConfig {
    /// Whether quota errors trigger the secondary endpoint at all
    #[serde(default = "default_fallback_enabled")]
    pub enabled: bool,

    /// Maximum fallback attempts per invocation (fixed at 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_fallback_enabled() -> bool {
    true
}

const fn default_max_attempts() -> u32 {
    1
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: default_fallback_enabled(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Outer retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for a rolling daily log file
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stream.timeout_seconds, 600);
        assert_eq!(config.stream.poll_interval_seconds, 5);
        assert!(config.fallback.enabled);
        assert_eq!(config.fallback.max_attempts, 1);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "stream": {"timeout_seconds": 120}
        }))
        .unwrap();
        assert_eq!(config.stream.timeout_seconds, 120);
        assert_eq!(config.stream.poll_interval_seconds, 5);
        assert!(config.fallback.enabled);
    }
}
