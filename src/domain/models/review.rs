//! Review output domain model.
//!
//! [`ReviewOutput`] is the single structured artifact this crate guarantees
//! per invocation. Every field carries a default so reconciliation can always
//! produce a complete value no matter how degraded the model output was.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall verdict of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// No blocking issues found
    Approved,
    /// Blocking issues that must be addressed
    NeedsChanges,
    /// Informational feedback only
    Comment,
}

impl Default for OverallStatus {
    fn default() -> Self {
        Self::Comment
    }
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::NeedsChanges => "NEEDS_CHANGES",
            Self::Comment => "COMMENT",
        }
    }
}

/// Which side of a diff a comment attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentSide {
    /// Old version of the file
    Left,
    /// New version of the file
    Right,
}

impl Default for CommentSide {
    fn default() -> Self {
        Self::Right
    }
}

/// Severity attached to an inline comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSeverity {
    /// Must-fix defect
    Error,
    /// Likely problem worth attention
    Warning,
    /// Neutral observation
    Info,
    /// Optional improvement
    Suggestion,
}

impl Default for CommentSeverity {
    fn default() -> Self {
        Self::Info
    }
}

/// A comment anchored to a specific line in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineComment {
    /// File path relative to the repository root
    pub path: String,
    /// Line number the comment attaches to
    pub line: u64,
    /// Diff side (LEFT = old, RIGHT = new)
    #[serde(default)]
    pub side: CommentSide,
    /// Comment body (markdown)
    pub body: String,
    /// Severity level
    #[serde(default)]
    pub severity: CommentSeverity,
}

/// Aggregate counts describing the review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetrics {
    /// Number of files reviewed
    #[serde(default)]
    pub files_reviewed: u64,
    /// Total issues found
    #[serde(default)]
    pub issues_found: u64,
    /// Critical issues count
    #[serde(default)]
    pub critical_issues: u64,
    /// Warning count
    #[serde(default)]
    pub warnings: u64,
    /// Suggestion count
    #[serde(default)]
    pub suggestions: u64,
    /// Style compliance score (0-100)
    #[serde(default)]
    pub style_score: f64,
}

/// How one agent used a model during the review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentModelUsage {
    /// Model path/name actually used
    #[serde(default)]
    pub model: String,
    /// Human-readable model name
    #[serde(default)]
    pub display_name: String,
    /// Whether the agent ended up on its fallback model
    #[serde(default)]
    pub used_fallback: bool,
}

/// Which models were used during the review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Per-agent usage records, keyed by agent name
    #[serde(default)]
    pub agents: BTreeMap<String, AgentModelUsage>,
    /// Agents that ended up on fallback models ("name (Display Name)")
    #[serde(default)]
    pub fallbacks_used: Vec<String>,
    /// Whether any fallback model was used
    #[serde(default)]
    pub used_fallback: bool,
}

/// Timing and estimated-cost metrics for one review invocation.
///
/// Token and cost figures come from a labeled heuristic estimator; they are
/// for monitoring only, never billing-authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total review wall-clock time in seconds
    #[serde(default)]
    pub review_duration_seconds: f64,
    /// Estimated total tokens (input + output)
    #[serde(default)]
    pub tokens_used: u64,
    /// Estimated input tokens
    #[serde(default)]
    pub input_tokens: u64,
    /// Estimated output tokens
    #[serde(default)]
    pub output_tokens: u64,
    /// Estimated cost in USD
    #[serde(default)]
    pub estimated_cost_usd: f64,
    /// Number of agents involved
    #[serde(default)]
    pub agents_used: u64,
    /// Total tool calls made
    #[serde(default)]
    pub tool_calls: u64,
    /// Number of stream events received
    #[serde(default)]
    pub chunks_received: u64,
}

/// Complete structured output of one review invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutput {
    /// Overall review summary (markdown)
    #[serde(default)]
    pub summary: String,
    /// Comments for specific lines
    #[serde(default)]
    pub inline_comments: Vec<InlineComment>,
    /// Overall review status
    #[serde(default)]
    pub overall_status: OverallStatus,
    /// Review metrics
    #[serde(default)]
    pub metrics: ReviewMetrics,
    /// Which models produced this review
    #[serde(default)]
    pub model_usage: ModelUsage,
    /// Timing and estimated-cost metrics
    #[serde(default)]
    pub performance: PerformanceMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(OverallStatus::NeedsChanges).unwrap(),
            json!("NEEDS_CHANGES")
        );
        assert_eq!(
            serde_json::from_value::<OverallStatus>(json!("APPROVED")).unwrap(),
            OverallStatus::Approved
        );
    }

    #[test]
    fn test_inline_comment_defaults() {
        let comment: InlineComment = serde_json::from_value(json!({
            "path": "src/auth.rs",
            "line": 42,
            "body": "use parameterized queries"
        }))
        .unwrap();
        assert_eq!(comment.side, CommentSide::Right);
        assert_eq!(comment.severity, CommentSeverity::Info);
    }

    #[test]
    fn test_output_deserializes_with_partial_fields() {
        let output: ReviewOutput = serde_json::from_value(json!({
            "summary": "LGTM - no significant issues.",
            "overall_status": "APPROVED",
            "metrics": {"files_reviewed": 3}
        }))
        .unwrap();
        assert_eq!(output.summary, "LGTM - no significant issues.");
        assert_eq!(output.overall_status, OverallStatus::Approved);
        assert_eq!(output.metrics.files_reviewed, 3);
        assert_eq!(output.metrics.issues_found, 0);
        assert!(output.inline_comments.is_empty());
    }

    #[test]
    fn test_invalid_status_rejected() {
        let result = serde_json::from_value::<OverallStatus>(json!("INVALID_STATUS"));
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip_keeps_wire_shape() {
        let output = ReviewOutput {
            summary: "Test review".to_string(),
            overall_status: OverallStatus::Comment,
            inline_comments: vec![InlineComment {
                path: "test.rs".to_string(),
                line: 1,
                side: CommentSide::Right,
                body: "Test comment".to_string(),
                severity: CommentSeverity::Suggestion,
            }],
            ..ReviewOutput::default()
        };

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["overall_status"], json!("COMMENT"));
        assert_eq!(value["inline_comments"][0]["severity"], json!("suggestion"));
        assert!(value.get("metrics").is_some());
        assert!(value.get("model_usage").is_some());
        assert!(value.get("performance").is_some());
    }
}
