//! Command-line argument definitions.

use clap::Parser;
use std::path::PathBuf;

/// Run one review invocation against a recorded or scripted event stream
/// and write the reconciled structured result.
#[derive(Debug, Parser)]
#[command(name = "verdict", version, about)]
pub struct Cli {
    /// Input JSON payload file (review context)
    #[arg(long)]
    pub payload: PathBuf,

    /// Recorded event stream to replay (JSONL dump or JSON array)
    #[arg(long)]
    pub events: PathBuf,

    /// Output JSON file path for the reconciled review
    #[arg(long)]
    pub output: PathBuf,

    /// Logical agent name recorded in telemetry
    #[arg(long, default_value = "code_reviewer")]
    pub agent: String,

    /// Primary model endpoint
    #[arg(long, env = "VERDICT_PRIMARY_MODEL", default_value = "gemini-2.5-pro")]
    pub primary_model: String,

    /// Secondary model endpoint (auto-paired with the primary when omitted)
    #[arg(long, env = "VERDICT_SECONDARY_MODEL")]
    pub secondary_model: Option<String>,

    /// Override the stream timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override the maximum retry attempts
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Load configuration from a specific file instead of .verdict/
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the raw JSON result to stdout instead of the summary
    #[arg(long)]
    pub json: bool,
}
