//! Stream aggregation.
//!
//! Folds an ordered event sequence into one combined text plus one merged
//! state map. Recomputed fresh from the full event list every time; there
//! is no incremental external mutation to reason about.

use serde_json::Value;

use crate::domain::models::RawEvent;

use super::normalizer::normalize;

/// Combined text and merged state for one event sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    /// Non-empty fragments joined by newline, trimmed
    pub combined_text: String,
    /// Shallow-merged state deltas, last write wins per key
    pub merged_state: serde_json::Map<String, Value>,
}

/// Aggregate an ordered event sequence.
///
/// Events are normalized strictly in arrival order; repeated state keys
/// resolve to the value from the latest event that carried them.
pub fn aggregate(events: &[RawEvent]) -> AggregateResult {
    let mut fragments: Vec<String> = Vec::new();
    let mut merged_state = serde_json::Map::new();

    for event in events {
        let normalized = normalize(event);
        fragments.extend(normalized.text_fragments);
        for (key, value) in normalized.state_delta {
            merged_state.insert(key, value);
        }
    }

    let combined_text = fragments
        .iter()
        .filter(|fragment| !fragment.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    AggregateResult {
        combined_text,
        merged_state,
    }
}
