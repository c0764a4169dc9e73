//! Verdict CLI entry point.

use clap::Parser;

use verdict::cli::{self, Cli};
use verdict::infrastructure::Logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli::resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => cli::handle_error(&err),
    };

    let _logger = match Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => cli::handle_error(&err),
    };

    if let Err(err) = cli::run(&cli, config).await {
        cli::handle_error(&err);
    }
}
