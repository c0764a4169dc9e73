//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid stream timeout: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("Invalid poll interval: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error("Invalid poll interval: {0}s exceeds the stream timeout of {1}s")]
    PollIntervalExceedsTimeout(u64, u64),

    #[error("Invalid fallback max_attempts: {0}. Exactly one fallback attempt is supported")]
    InvalidFallbackAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.verdict/config.yaml` (project config)
    /// 3. `.verdict/local.yaml` (local overrides, optional)
    /// 4. Environment variables (`VERDICT_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".verdict/config.yaml"))
            .merge(Yaml::file(".verdict/local.yaml"))
            .merge(Env::prefixed("VERDICT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.stream.timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout(config.stream.timeout_seconds));
        }
        if config.stream.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidPollInterval(
                config.stream.poll_interval_seconds,
            ));
        }
        if config.stream.poll_interval_seconds > config.stream.timeout_seconds {
            return Err(ConfigError::PollIntervalExceedsTimeout(
                config.stream.poll_interval_seconds,
                config.stream.timeout_seconds,
            ));
        }

        if config.fallback.max_attempts != 1 {
            return Err(ConfigError::InvalidFallbackAttempts(
                config.fallback.max_attempts,
            ));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
