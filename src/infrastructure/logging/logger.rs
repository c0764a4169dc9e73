//! Logger initialization using tracing.

use anyhow::{anyhow, Result};
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::domain::models::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialized logger; holds the appender guard so buffered file output is
/// flushed on drop.
pub struct Logger {
    _guard: Option<WorkerGuard>,
}

impl Logger {
    /// Initialize the global subscriber from the logging configuration.
    ///
    /// Diagnostics go to stderr (stdout is reserved for command output);
    /// when a log directory is configured a daily-rolling JSON file layer
    /// is added.
    ///
    /// # Errors
    /// Returns an error if the level cannot be parsed or a subscriber is
    /// already installed.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        let stderr_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();
        layers.push(stderr_layer(&config.format, stderr_filter));

        let guard = if let Some(ref log_dir) = config.log_dir {
            let file_appender = rolling::daily(log_dir, "verdict.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let file_filter = EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy();

            // File layer is always JSON for structured log processing.
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(file_filter)
                    .boxed(),
            );

            Some(guard)
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|err| anyhow!("failed to install subscriber: {err}"))?;

        Ok(Self { _guard: guard })
    }
}

fn stderr_layer(format: &str, filter: EnvFilter) -> BoxedLayer {
    if format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed()
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow!("invalid log level: {other}")),
    }
}
