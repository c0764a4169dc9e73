//! Heuristic token and cost estimation.
//!
//! These figures are monitoring aids, not billing data. Token counts assume
//! roughly four UTF-8 bytes per token, which holds within about ±30% for
//! English prose and code; actual tokenization varies by model.

use tracing::warn;

/// Estimated tokens above which a high-usage warning is logged.
const HIGH_USAGE_THRESHOLD: u64 = 500_000;

/// Pricing tier boundary: requests above this many input tokens are billed
/// at the long-context rate.
const LONG_CONTEXT_TOKENS: u64 = 200_000;

/// USD per million input tokens, standard tier.
const INPUT_PER_MILLION: f64 = 1.25;
/// USD per million output tokens, standard tier.
const OUTPUT_PER_MILLION: f64 = 10.00;
/// USD per million input tokens, long-context tier.
const INPUT_PER_MILLION_LONG: f64 = 2.50;
/// USD per million output tokens, long-context tier.
const OUTPUT_PER_MILLION_LONG: f64 = 15.00;

/// Estimate the token count of a text (1 token ≈ 4 UTF-8 bytes).
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64) / 4
}

/// Estimate the cost of one request in USD from heuristic token counts.
///
/// Uses the tiered per-million pricing of the primary model family; the
/// long-context tier applies when the input exceeds 200k tokens.
pub fn estimate_cost_usd(input_tokens: u64, output_tokens: u64) -> f64 {
    let (input_rate, output_rate) = if input_tokens > LONG_CONTEXT_TOKENS {
        (INPUT_PER_MILLION_LONG, OUTPUT_PER_MILLION_LONG)
    } else {
        (INPUT_PER_MILLION, OUTPUT_PER_MILLION)
    };

    let input_cost = (input_tokens as f64 / 1_000_000.0) * input_rate;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * output_rate;
    input_cost + output_cost
}

/// Log estimated token usage, warning when it crosses the high-usage mark.
pub fn log_token_usage(input_tokens: u64, output_tokens: u64) {
    let total = input_tokens + output_tokens;
    tracing::info!(
        input_tokens,
        output_tokens,
        total_tokens = total,
        "token usage estimate"
    );

    if total > HIGH_USAGE_THRESHOLD {
        warn!(
            total_tokens = total,
            "high token usage detected; consider reducing payload size or consolidating agents"
        );
    }
}
