//! Session state and model usage tracking.
//!
//! The surrounding orchestration runtime owns a mutable key-value state for
//! each review session. This crate reads from it and appends
//! [`FallbackRecord`]s under one fixed key; every other key is read-only
//! from here.

use serde_json::Value;

use super::endpoint::{FallbackRecord, ModelEndpoint};
use super::review::{AgentModelUsage, ModelUsage};

/// Key under which fallback records accumulate in session state.
pub const MODEL_FALLBACKS_KEY: &str = "model_fallbacks";

/// Mutable per-invocation state shared with the surrounding runtime.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    entries: serde_json::Map<String, Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing state map owned by the caller.
    pub fn from_map(entries: serde_json::Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Read a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Append one fallback record under [`MODEL_FALLBACKS_KEY`].
    ///
    /// If the key holds something other than a list the append is skipped;
    /// the session state belongs to the caller and is never clobbered.
    pub fn record_fallback(&mut self, record: &FallbackRecord) {
        let entry = self
            .entries
            .entry(MODEL_FALLBACKS_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        match entry {
            Value::Array(records) => match serde_json::to_value(record) {
                Ok(value) => records.push(value),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize fallback record");
                }
            },
            other => {
                tracing::warn!(
                    found = %other,
                    "session state key {MODEL_FALLBACKS_KEY} is not a list, skipping append"
                );
            }
        }
    }

    /// Fallback records accumulated so far.
    pub fn fallbacks(&self) -> Vec<FallbackRecord> {
        self.entries
            .get(MODEL_FALLBACKS_KEY)
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|value| serde_json::from_value(value.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// View of the underlying map, for handing back to the caller.
    pub fn as_map(&self) -> &serde_json::Map<String, Value> {
        &self.entries
    }

    /// Consume the wrapper and return the underlying map.
    pub fn into_map(self) -> serde_json::Map<String, Value> {
        self.entries
    }
}

/// Tracks which models each agent used during one review session.
#[derive(Debug, Clone, Default)]
pub struct ModelUsageTracker {
    usage: ModelUsage,
}

impl ModelUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `agent` used `endpoint`, optionally as a fallback.
    pub fn record(&mut self, agent: &str, endpoint: &ModelEndpoint, used_fallback: bool) {
        let display_name = endpoint.display_name();
        self.usage.agents.insert(
            agent.to_string(),
            AgentModelUsage {
                model: endpoint.name.clone(),
                display_name: display_name.clone(),
                used_fallback,
            },
        );

        if used_fallback {
            self.usage
                .fallbacks_used
                .push(format!("{agent} ({display_name})"));
            self.usage.used_fallback = true;
        }
    }

    /// Markdown note for the review summary when fallbacks were involved.
    ///
    /// Empty when every agent stayed on its primary model.
    pub fn fallback_note(&self) -> String {
        if self.usage.fallbacks_used.is_empty() {
            return String::new();
        }
        let agents = self.usage.fallbacks_used.join(", ");
        format!(
            "\n\n---\n**Note:** This review used open source fallback models ({agents}) \
             due to primary model token/quota limits. Review quality may be slightly reduced."
        )
    }

    /// Snapshot of the accumulated usage.
    pub fn summary(&self) -> ModelUsage {
        self.usage.clone()
    }
}
