//! Event normalization.
//!
//! Converts one opaque [`RawEvent`] into a canonical [`NormalizedEvent`]
//! regardless of which wire shape produced it. Extraction is best-effort
//! and purely additive: unknown layouts yield an empty event, never an
//! error, because the wire shape is allowed to evolve under us.

use serde_json::Value;

use crate::domain::models::{NormalizedEvent, RawEvent, StreamedEvent};

/// Normalize one raw event into text fragments and a state delta.
pub fn normalize(raw: &RawEvent) -> NormalizedEvent {
    match raw {
        RawEvent::Text(text) => {
            let text_fragments = if text.is_empty() {
                Vec::new()
            } else {
                vec![text.clone()]
            };
            NormalizedEvent {
                text_fragments,
                state_delta: serde_json::Map::new(),
            }
        }
        RawEvent::Structured(event) => NormalizedEvent {
            text_fragments: structured_text_fragments(event),
            state_delta: event
                .actions
                .as_ref()
                .and_then(|actions| actions.state_delta.clone())
                .unwrap_or_default(),
        },
        RawEvent::Value(value) => NormalizedEvent {
            text_fragments: loose_text_fragments(value),
            state_delta: loose_state_delta(value),
        },
    }
}

/// Text fragments from the typed event shape.
///
/// The candidate-nested layout wins when it yields anything; otherwise the
/// direct `content.parts` layout is read.
fn structured_text_fragments(event: &StreamedEvent) -> Vec<String> {
    let from_candidates: Vec<String> = event
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_ref())
        .filter(|text| !text.is_empty())
        .cloned()
        .collect();
    if !from_candidates.is_empty() {
        return from_candidates;
    }

    event
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_ref())
                .filter(|text| !text.is_empty())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Text fragments from a loose JSON mapping, tried shape by shape.
fn loose_text_fragments(value: &Value) -> Vec<String> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };

    // Alternate shape: {"candidates": [{"content": {"parts": [{"text": ...}]}}]}
    if let Some(candidates) = map.get("candidates").and_then(Value::as_array) {
        let fragments: Vec<String> = candidates
            .iter()
            .filter_map(|candidate| candidate.get("content"))
            .filter_map(|content| content.get("parts"))
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(part_text)
            .collect();
        if !fragments.is_empty() {
            return fragments;
        }
    }

    let content = map.get("content");

    // Common shape: {"content": {"parts": [{"text": ...}]}}
    if let Some(parts) = content
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
    {
        let fragments: Vec<String> = parts.iter().filter_map(part_text).collect();
        if !fragments.is_empty() {
            return fragments;
        }
    }

    // Content as a list of blocks: [{"text": ...}, "bare string", ...]
    if let Some(blocks) = content.and_then(Value::as_array) {
        let fragments: Vec<String> = blocks
            .iter()
            .filter_map(|block| match block {
                Value::String(text) if !text.is_empty() => Some(text.clone()),
                other => part_text(other),
            })
            .collect();
        if !fragments.is_empty() {
            return fragments;
        }
    }

    // Content as a bare string.
    if let Some(text) = content.and_then(Value::as_str) {
        if !text.is_empty() {
            return vec![text.to_string()];
        }
    }

    // Last resort: {"text": ...} at the top level.
    if let Some(text) = map.get("text").and_then(Value::as_str) {
        if !text.is_empty() {
            return vec![text.to_string()];
        }
    }

    Vec::new()
}

/// `{"text": "..."}` part accessor, ignoring empty and non-string payloads.
fn part_text(part: &Value) -> Option<String> {
    part.get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

/// State delta from a loose JSON mapping: `actions.state_delta` if present.
fn loose_state_delta(value: &Value) -> serde_json::Map<String, Value> {
    value
        .as_object()
        .and_then(|map| map.get("actions"))
        .and_then(Value::as_object)
        .and_then(|actions| actions.get("state_delta"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
