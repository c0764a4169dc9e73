//! Streamed event domain model.
//!
//! The backend emits loosely-typed events whose shape depends on SDK version
//! and transport: a typed event object, a plain JSON mapping with a similar
//! layout, or occasionally a bare string. Everything is decoded into
//! [`RawEvent`] at the boundary so downstream code never branches on wire
//! shape again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which attempt of a routed invocation produced an event.
///
/// A fallback retry restarts the producer from the beginning, so a consumer
/// that already streamed primary-attempt output can observe duplicates. The
/// tag makes the transition detectable instead of silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptId {
    /// Event produced while streaming from the primary endpoint
    Primary,
    /// Event produced after the sticky switch to the secondary endpoint
    Fallback,
}

/// One forwarded event, tagged with the attempt that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEvent {
    /// Attempt the event belongs to
    pub attempt: AttemptId,
    /// The event as received from the producer
    pub event: RawEvent,
}

/// A single text part inside structured event content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPart {
    /// Text payload, absent for non-text parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Content block holding ordered parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContent {
    /// Ordered content parts
    #[serde(default)]
    pub parts: Vec<EventPart>,
}

/// One generation candidate (the alternate wire shape nests content here).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCandidate {
    /// Candidate content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EventContent>,
}

/// Side effects attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventActions {
    /// Partial update to the shared session result accumulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_delta: Option<serde_json::Map<String, Value>>,
}

/// The typed event shape emitted by current SDK versions.
///
/// Both observed layouts are covered: `content.parts[].text` and the
/// candidate-nested `candidates[].content.parts[].text`. Unknown fields are
/// ignored so the shape can keep evolving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamedEvent {
    /// Direct content (older layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EventContent>,
    /// Candidate-nested content (newer layout)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<EventCandidate>,
    /// Attached actions, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<EventActions>,
}

/// One unit of producer output, shape unowned by this crate.
///
/// Decoding is tolerant by construction: a bare string, the typed shape, or
/// any other JSON value all decode successfully. A mapping that fits
/// [`StreamedEvent`] decodes as `Structured`; everything else lands in
/// `Value` for the loose key-access path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawEvent {
    /// Bare string chunk
    Text(String),
    /// Typed event object
    Structured(StreamedEvent),
    /// Any other JSON value (mapping with unexpected layout, number, null)
    Value(Value),
}

// Deserialization must route through `from_value` so that mappings the
// typed shape cannot represent (top-level `text`, `content` as a string)
// stay on the loose-value path instead of decoding as vacant events.
impl<'de> serde::Deserialize<'de> for RawEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

impl StreamedEvent {
    /// True when the typed decode matched nothing the normalizer can use.
    ///
    /// A mapping with only unfamiliar keys parses as an all-empty event;
    /// such mappings must stay on the loose-value path so alternate layouts
    /// (top-level `text`, `content` as a bare string) are not dropped.
    pub fn is_vacant(&self) -> bool {
        self.content.is_none() && self.candidates.is_empty() && self.actions.is_none()
    }
}

impl RawEvent {
    /// Decode a raw JSON value into an event without ever failing.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            other => match serde_json::from_value::<StreamedEvent>(other.clone()) {
                Ok(event) if !event.is_vacant() => Self::Structured(event),
                _ => Self::Value(other),
            },
        }
    }
}

/// Canonical (text fragments, state delta) pair derived from one raw event.
///
/// Pure data: deriving it has no side effects and never fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedEvent {
    /// Ordered non-empty text fragments
    pub text_fragments: Vec<String>,
    /// Partial state update carried by the event
    pub state_delta: serde_json::Map<String, Value>,
}

impl NormalizedEvent {
    /// True when the event carried neither text nor state.
    pub fn is_empty(&self) -> bool {
        self.text_fragments.is_empty() && self.state_delta.is_empty()
    }
}
