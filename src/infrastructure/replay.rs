//! Replay producer: streams events from a recorded dump.
//!
//! The source system can dump its stream chunks to a JSONL file for
//! debugging; this adapter plays such a dump (or a plain JSON array of
//! events) back through the [`EventProducer`] port. It is the transport
//! used by the CLI and by end-to-end tests, since the real model transport
//! lives outside this crate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::domain::models::{ModelEndpoint, RawEvent};
use crate::domain::ports::{EventProducer, EventStream, ProducerError};

/// Streams a fixed, pre-recorded event sequence for any endpoint.
#[derive(Debug, Clone)]
pub struct ReplayProducer {
    events: Vec<RawEvent>,
}

impl ReplayProducer {
    pub const fn new(events: Vec<RawEvent>) -> Self {
        Self { events }
    }

    /// Load a recorded stream from a file.
    ///
    /// Accepts either a JSON array of events or JSONL (one event per line).
    /// Dump records shaped `{"i": n, "chunk": {...}}` are unwrapped to
    /// their chunk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event dump {}", path.display()))?;
        Self::from_str(&raw)
            .with_context(|| format!("failed to parse event dump {}", path.display()))
    }

    /// Parse a dump from a string (JSON array or JSONL).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(Vec::new()));
        }

        let values: Vec<Value> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed).context("invalid JSON array")?
        } else {
            trimmed
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| {
                    serde_json::from_str::<Value>(line)
                        .with_context(|| format!("invalid JSONL line: {line}"))
                })
                .collect::<Result<_>>()?
        };

        let events = values.into_iter().map(unwrap_dump_record).collect();
        Ok(Self::new(events))
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the recording holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Unwrap `{"i": n, "type": ..., "chunk": {...}}` dump records; anything
/// else is treated as the event itself.
fn unwrap_dump_record(value: Value) -> RawEvent {
    let chunk = match value {
        Value::Object(mut map) if map.contains_key("chunk") => {
            map.remove("chunk").unwrap_or(Value::Null)
        }
        other => other,
    };
    RawEvent::from_value(chunk)
}

#[async_trait]
impl EventProducer for ReplayProducer {
    async fn stream_events(&self, endpoint: &ModelEndpoint) -> Result<EventStream, ProducerError> {
        tracing::debug!(endpoint = %endpoint, events = self.events.len(), "replaying recorded stream");
        let events: Vec<Result<RawEvent, ProducerError>> =
            self.events.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[test]
    fn test_replays_jsonl_dump() {
        let dump = concat!(
            r#"{"i": 0, "type": "Event", "chunk": {"content": {"parts": [{"text": "hello"}]}}}"#,
            "\n",
            r#"{"i": 1, "type": "Event", "chunk": {"actions": {"state_delta": {"k": 1}}}}"#,
            "\n",
        );
        let producer = ReplayProducer::from_str(dump).expect("parse");
        assert_eq!(producer.len(), 2);

        let mut stream = tokio_test::block_on(
            producer.stream_events(&ModelEndpoint::new("gemini-2.5-pro")),
        )
        .expect("stream");
        let first = tokio_test::block_on(stream.next())
            .expect("item")
            .expect("event");
        assert!(matches!(first, RawEvent::Structured(_)));
    }

    #[test]
    fn test_parses_json_array() {
        let producer = ReplayProducer::from_str(r#"[{"text": "a"}, "bare"]"#).expect("parse");
        assert_eq!(producer.len(), 2);
    }

    #[test]
    fn test_empty_input_is_empty_recording() {
        let producer = ReplayProducer::from_str("  \n ").expect("parse");
        assert!(producer.is_empty());
    }

    #[test]
    fn test_invalid_line_is_an_error() {
        assert!(ReplayProducer::from_str("not json at all {").is_err());
    }

    #[test]
    fn test_unwrap_plain_events_without_dump_envelope() {
        let producer =
            ReplayProducer::from_str(r#"{"content": {"parts": [{"text": "x"}]}}"#).expect("parse");
        assert_eq!(producer.len(), 1);
    }

    #[test]
    fn test_from_file_round_trip() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "{}", json!({"text": "recorded"})).expect("write");

        let producer = ReplayProducer::from_file(file.path()).expect("load");
        assert_eq!(producer.len(), 1);
    }
}
