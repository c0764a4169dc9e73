//! Bounded consumption of the routed event stream.
//!
//! One worker task drives the executor and sends events through a channel;
//! the consumer collects them in arrival order while enforcing the overall
//! wall-clock timeout on a fixed poll interval. Stall-since-last-event is
//! logged for diagnostics only; elapsed total time is the only hard cutoff.
//!
//! On timeout the worker is NOT aborted. It keeps driving the producer in
//! the background until its next send fails against the dropped channel,
//! an accepted leak, matching the daemonized worker in the source system.

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::models::AttemptEvent;

use super::executor::{ExecutionSummary, ExecutorError};

/// Seconds before a "no events yet" diagnostic is logged.
const FIRST_EVENT_WARN_SECS: u64 = 30;

/// Seconds since the last event before a stall diagnostic is logged.
const STALL_WARN_SECS: u64 = 120;

/// Error raised at the consumer boundary.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    /// The invocation exceeded its wall-clock budget.
    #[error("stream query timed out after {timeout_seconds}s (received {events_received} events)")]
    Timeout {
        /// Configured timeout in seconds
        timeout_seconds: u64,
        /// Events collected before the deadline
        events_received: usize,
    },

    /// The stream finished cleanly but produced nothing.
    ///
    /// Distinct from timeout: the producer completed normally without
    /// emitting a single event, which usually means the agent updated
    /// state without producing streamable output.
    #[error(
        "no events received from producer after clean stream completion; \
         the agent likely updated state without producing streamable output"
    )]
    EmptyStream,

    /// The worker finished with an execution error; re-raised here.
    #[error(transparent)]
    Execution(#[from] ExecutorError),

    /// The worker task itself died (panic or cancellation).
    #[error("stream worker died: {0}")]
    Worker(String),
}

/// Everything collected from one bounded consumption.
#[derive(Debug)]
pub struct StreamCapture {
    /// Events in arrival order, tagged with their attempt
    pub events: Vec<AttemptEvent>,
    /// The worker's execution summary
    pub summary: ExecutionSummary,
    /// Wall-clock time the stream took
    pub elapsed: Duration,
}

/// Collects a routed event stream under a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct BoundedStreamConsumer {
    timeout: Duration,
    poll_interval: Duration,
}

impl BoundedStreamConsumer {
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Collect events until the worker finishes or the timeout elapses.
    ///
    /// # Errors
    /// [`ConsumeError::Timeout`] when the deadline passes (the worker keeps
    /// running); the worker's own error, re-raised, when it fails; and
    /// [`ConsumeError::EmptyStream`] when a clean finish produced nothing.
    pub async fn consume(
        &self,
        mut events: mpsc::UnboundedReceiver<AttemptEvent>,
        worker: JoinHandle<Result<ExecutionSummary, ExecutorError>>,
    ) -> Result<StreamCapture, ConsumeError> {
        let started = Instant::now();
        let mut last_event = started;
        let mut buffer: Vec<AttemptEvent> = Vec::new();
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Some(event) => {
                        last_event = Instant::now();
                        buffer.push(event);
                        if buffer.len() % 10 == 0 {
                            debug!(
                                events = buffer.len(),
                                elapsed_secs = started.elapsed().as_secs(),
                                "stream progress"
                            );
                        }
                    }
                    // Sender dropped: the worker is done.
                    None => break,
                },
                _ = ticker.tick() => {
                    let elapsed = started.elapsed();
                    if elapsed > self.timeout {
                        warn!(
                            events = buffer.len(),
                            timeout_secs = self.timeout.as_secs(),
                            "stream timed out; worker left running"
                        );
                        return Err(ConsumeError::Timeout {
                            timeout_seconds: self.timeout.as_secs(),
                            events_received: buffer.len(),
                        });
                    }

                    // Diagnostics only, never a cutoff.
                    if buffer.is_empty() && elapsed.as_secs() > FIRST_EVENT_WARN_SECS {
                        warn!(
                            elapsed_secs = elapsed.as_secs(),
                            "no events received yet"
                        );
                    } else if !buffer.is_empty()
                        && last_event.elapsed().as_secs() > STALL_WARN_SECS
                    {
                        warn!(
                            stalled_secs = last_event.elapsed().as_secs(),
                            events = buffer.len(),
                            "no new events for a while"
                        );
                    }
                }
            }
        }

        let summary = match worker.await {
            Ok(result) => result?,
            Err(join_error) => return Err(ConsumeError::Worker(join_error.to_string())),
        };

        if buffer.is_empty() {
            return Err(ConsumeError::EmptyStream);
        }

        debug!(
            events = buffer.len(),
            elapsed_secs = started.elapsed().as_secs(),
            "stream completed"
        );

        Ok(StreamCapture {
            events: buffer,
            summary,
            elapsed: started.elapsed(),
        })
    }
}
