//! Command-line interface.

pub mod args;
pub mod display;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::application::{ReviewRequest, ReviewSession};
use crate::domain::models::Config;
use crate::infrastructure::{ConfigLoader, ReplayProducer};

pub use args::Cli;

/// Resolve configuration from files/env and apply CLI overrides.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    if let Some(timeout) = cli.timeout {
        config.stream.timeout_seconds = timeout;
    }
    if let Some(max_retries) = cli.max_retries {
        config.retry.max_retries = max_retries;
    }
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Execute the review command.
pub async fn run(cli: &Cli, config: Config) -> Result<()> {
    let payload_raw = std::fs::read_to_string(&cli.payload)
        .with_context(|| format!("failed to read payload {}", cli.payload.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&payload_raw)
        .with_context(|| format!("invalid JSON payload {}", cli.payload.display()))?;

    let producer = ReplayProducer::from_file(&cli.events)?;
    info!(events = producer.len(), "loaded recorded event stream");

    let request = ReviewRequest {
        agent_name: cli.agent.clone(),
        primary_model: cli.primary_model.clone(),
        secondary_model: cli.secondary_model.clone(),
        payload,
    };

    let session = ReviewSession::new(config);
    let outcome = session.run(&request, Arc::new(producer)).await?;

    let rendered =
        serde_json::to_string_pretty(&outcome.output).context("failed to encode review output")?;
    std::fs::write(&cli.output, rendered.as_bytes())
        .with_context(|| format!("failed to write output {}", cli.output.display()))?;
    info!(path = %cli.output.display(), "review output written");

    if cli.json {
        println!("{rendered}");
    } else {
        println!("{}", display::render(&outcome.output, &outcome.fallbacks));
    }

    Ok(())
}

/// Print a failure and exit non-zero.
pub fn handle_error(err: &anyhow::Error) -> ! {
    eprintln!("{} {err:#}", console::style("error:").red().bold());
    std::process::exit(1);
}
