//! Human-readable rendering of a review result.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::style;

use crate::domain::models::{FallbackRecord, ReviewOutput};

/// Longest summary excerpt shown inline; the full text lives in the output
/// file.
const SUMMARY_PREVIEW_CHARS: usize = 500;

/// Inline comments previewed before eliding the rest.
const COMMENT_PREVIEW_COUNT: usize = 3;

/// Create a standard key/value table.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
fn metrics_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render the full result for terminal output.
pub fn render(output: &ReviewOutput, fallbacks: &[FallbackRecord]) -> String {
    let mut sections = Vec::new();

    sections.push(format!("{}", style("REVIEW SUMMARY").bold()));
    sections.push(summary_excerpt(&output.summary));

    let mut table = metrics_table();
    table.add_row(vec![
        Cell::new("Status"),
        Cell::new(output.overall_status.as_str()).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Files reviewed"),
        Cell::new(output.metrics.files_reviewed).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Issues found"),
        Cell::new(output.metrics.issues_found).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Critical"),
        Cell::new(output.metrics.critical_issues).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Warnings"),
        Cell::new(output.metrics.warnings).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Suggestions"),
        Cell::new(output.metrics.suggestions).set_alignment(CellAlignment::Right),
    ]);
    sections.push(format!("\n{}\n{table}", style("METRICS").bold()));

    let perf = &output.performance;
    sections.push(format!(
        "{} {:.1}s, {} events, ~{} tokens, ~${:.4} (heuristic)",
        style("Performance:").bold(),
        perf.review_duration_seconds,
        perf.chunks_received,
        perf.tokens_used,
        perf.estimated_cost_usd,
    ));

    if !output.inline_comments.is_empty() {
        sections.push(format!(
            "\n{} {}",
            style("INLINE COMMENTS:").bold(),
            output.inline_comments.len()
        ));
        for comment in output.inline_comments.iter().take(COMMENT_PREVIEW_COUNT) {
            let body: String = comment.body.chars().take(100).collect();
            sections.push(format!("  {}:{} {}", comment.path, comment.line, body));
        }
        if output.inline_comments.len() > COMMENT_PREVIEW_COUNT {
            sections.push(format!(
                "  … and {} more",
                output.inline_comments.len() - COMMENT_PREVIEW_COUNT
            ));
        }
    }

    if !fallbacks.is_empty() {
        let names: Vec<String> = fallbacks
            .iter()
            .map(|record| format!("{} → {}", record.primary, record.fallback))
            .collect();
        sections.push(format!(
            "\n{} {}",
            style("Fallbacks used:").yellow().bold(),
            names.join(", ")
        ));
    }

    sections.join("\n")
}

fn summary_excerpt(summary: &str) -> String {
    if summary.chars().count() <= SUMMARY_PREVIEW_CHARS {
        return summary.to_string();
    }
    let excerpt: String = summary.chars().take(SUMMARY_PREVIEW_CHARS).collect();
    format!("{excerpt}\n… (truncated, see the output file for the full summary)")
}
