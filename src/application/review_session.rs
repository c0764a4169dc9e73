//! One review invocation, end to end.
//!
//! Composes the routed executor with the bounded consumer, aggregates and
//! reconciles the captured stream, and stamps usage metadata onto the
//! result. Exactly one [`ReviewOutput`] comes out of a completed run;
//! terminal quota exhaustion is reported as an explicit review result
//! rather than a generic failure so the workflow can post something
//! actionable, while every other fatal error bubbles as one descriptive
//! error.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::models::{
    Config, FallbackRecord, ModelEndpoint, ModelUsageTracker, OverallStatus, PerformanceMetrics,
    ReviewOutput, SessionState,
};
use crate::domain::ports::EventProducer;
use crate::services::consumer::{BoundedStreamConsumer, ConsumeError, StreamCapture};
use crate::services::estimator::{estimate_cost_usd, estimate_tokens, log_token_usage};
use crate::services::executor::RoutedExecutor;
use crate::services::retry::RetryPolicy;
use crate::services::router::{is_model_error, is_quota_error, EndpointRouter};
use crate::services::{aggregate, reconcile};

/// What one review invocation should execute.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Name of the logical agent performing the review
    pub agent_name: String,
    /// Primary model endpoint
    pub primary_model: String,
    /// Secondary model endpoint; auto-paired when absent
    pub secondary_model: Option<String>,
    /// Review context payload (used for size and token estimates)
    pub payload: Value,
}

/// Result of one completed review invocation.
#[derive(Debug)]
pub struct SessionOutcome {
    /// The single canonical review output
    pub output: ReviewOutput,
    /// Fallback records accumulated in session state
    pub fallbacks: Vec<FallbackRecord>,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session completed
    pub completed_at: DateTime<Utc>,
}

/// Orchestrates one review invocation against a producer.
pub struct ReviewSession {
    config: Config,
    session_id: Uuid,
}

impl ReviewSession {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4(),
        }
    }

    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Run the review to completion.
    ///
    /// Transient model failures are retried with exponential backoff; a
    /// terminal quota exhaustion becomes an explicit review result. Other
    /// terminal failures (timeout included) return an error.
    pub async fn run(
        &self,
        request: &ReviewRequest,
        producer: Arc<dyn EventProducer>,
    ) -> anyhow::Result<SessionOutcome> {
        let started_at = Utc::now();
        let payload_text =
            serde_json::to_string(&request.payload).context("failed to encode review payload")?;
        info!(
            session_id = %self.session_id,
            agent = %request.agent_name,
            payload_bytes = payload_text.len(),
            "starting review session"
        );

        let session = Arc::new(Mutex::new(SessionState::new()));
        let policy = RetryPolicy::from_config(&self.config.retry);

        let attempt = policy
            .execute(
                || self.attempt(request, Arc::clone(&producer), Arc::clone(&session)),
                |err: &ConsumeError| is_model_error(err),
            )
            .await;

        let capture = match attempt {
            Ok(capture) => capture,
            Err(err) => {
                if let ConsumeError::Execution(exec_err) = &err {
                    if is_quota_error(exec_err.terminal_cause()) {
                        info!(
                            session_id = %self.session_id,
                            error = %exec_err,
                            "quota exhausted on every endpoint, returning explicit result"
                        );
                        return Ok(SessionOutcome {
                            output: quota_exhausted_output(),
                            fallbacks: lock_fallbacks(&session),
                            started_at,
                            completed_at: Utc::now(),
                        });
                    }
                }
                return Err(anyhow::Error::new(err).context(format!(
                    "review session {} failed for agent {}",
                    self.session_id, request.agent_name
                )));
            }
        };

        let output = self.assemble(request, &payload_text, &capture);
        Ok(SessionOutcome {
            output,
            fallbacks: lock_fallbacks(&session),
            started_at,
            completed_at: Utc::now(),
        })
    }

    /// One bounded, routed attempt: spawn the worker and collect its stream.
    async fn attempt(
        &self,
        request: &ReviewRequest,
        producer: Arc<dyn EventProducer>,
        session: Arc<Mutex<SessionState>>,
    ) -> Result<StreamCapture, ConsumeError> {
        let primary = ModelEndpoint::new(&request.primary_model);
        let secondary = request
            .secondary_model
            .as_ref()
            .map(ModelEndpoint::new);
        let router = EndpointRouter::new(
            &request.agent_name,
            primary,
            secondary,
            self.config.fallback.enabled,
        );
        let executor = RoutedExecutor::new(router);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(executor.run(producer, events_tx, session));

        let consumer = BoundedStreamConsumer::new(
            self.config.stream.timeout(),
            self.config.stream.poll_interval(),
        );
        consumer.consume(events_rx, worker).await
    }

    /// Reconcile the capture and stamp usage metadata onto the output.
    fn assemble(
        &self,
        request: &ReviewRequest,
        payload_text: &str,
        capture: &StreamCapture,
    ) -> ReviewOutput {
        let raw_events: Vec<_> = capture
            .events
            .iter()
            .map(|attempt_event| attempt_event.event.clone())
            .collect();
        let aggregated = aggregate(&raw_events);
        debug!(
            session_id = %self.session_id,
            text_len = aggregated.combined_text.len(),
            state_keys = aggregated.merged_state.len(),
            "aggregated event stream"
        );

        let mut output = reconcile(&aggregated.combined_text, &aggregated.merged_state);

        let mut tracker = ModelUsageTracker::new();
        tracker.record(
            &request.agent_name,
            &ModelEndpoint::new(&capture.summary.usage.model),
            capture.summary.usage.used_fallback,
        );
        let note = tracker.fallback_note();
        if !note.is_empty() {
            output.summary.push_str(&note);
        }
        output.model_usage = tracker.summary();

        let input_tokens = estimate_tokens(payload_text);
        let output_tokens = estimate_tokens(&aggregated.combined_text);
        log_token_usage(input_tokens, output_tokens);

        output.performance = PerformanceMetrics {
            review_duration_seconds: capture.elapsed.as_secs_f64(),
            tokens_used: input_tokens + output_tokens,
            input_tokens,
            output_tokens,
            estimated_cost_usd: estimate_cost_usd(input_tokens, output_tokens),
            agents_used: 1,
            tool_calls: 0,
            chunks_received: capture.events.len() as u64,
        };

        output
    }
}

/// Snapshot the fallback records out of the shared session state.
fn lock_fallbacks(session: &Arc<Mutex<SessionState>>) -> Vec<FallbackRecord> {
    session
        .lock()
        .map(|state| state.fallbacks())
        .unwrap_or_default()
}

/// Explicit review result for terminal quota exhaustion.
///
/// Quota problems are not hidden behind a generic failure: the workflow
/// posts this result so the reader knows what happened and what to do.
fn quota_exhausted_output() -> ReviewOutput {
    ReviewOutput {
        summary: "**Code review failed due to token/quota restrictions (429 RESOURCE_EXHAUSTED).**\n\n\
                  This run could not complete because the model backend rate-limited the call \
                  on every available endpoint.\n\n\
                  - **What to do**: re-run later, reduce the PR payload size, or request higher quota.\n\
                  - **Diagnostic**: check backend logs for `RESOURCE_EXHAUSTED` / `429`."
            .to_string(),
        overall_status: OverallStatus::Comment,
        ..ReviewOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RawEvent;
    use crate::domain::ports::{EventStream, ProducerError, ProducerErrorKind};
    use async_trait::async_trait;
    use serde_json::json;

    fn request() -> ReviewRequest {
        ReviewRequest {
            agent_name: "reviewer".to_string(),
            primary_model: "gemini-2.5-pro".to_string(),
            secondary_model: None,
            payload: json!({"pr_metadata": {"pr_number": 7}}),
        }
    }

    fn config() -> Config {
        use crate::domain::models::{RetryConfig, StreamConfig};
        Config {
            stream: StreamConfig {
                timeout_seconds: 5,
                poll_interval_seconds: 1,
            },
            retry: RetryConfig {
                initial_backoff_ms: 1,
                max_backoff_ms: 10,
                ..RetryConfig::default()
            },
            ..Config::default()
        }
    }

    /// Producer emitting a structured review via state delta.
    struct StateDeltaProducer;

    #[async_trait]
    impl EventProducer for StateDeltaProducer {
        async fn stream_events(
            &self,
            _endpoint: &ModelEndpoint,
        ) -> Result<EventStream, ProducerError> {
            let events: Vec<Result<RawEvent, ProducerError>> = vec![
                Ok(RawEvent::from_value(json!({
                    "content": {"parts": [{"text": "Reviewing..."}]}
                }))),
                Ok(RawEvent::from_value(json!({
                    "actions": {"state_delta": {"code_review_output": {
                        "summary": "LGTM",
                        "overall_status": "APPROVED",
                        "metrics": {"files_reviewed": 2}
                    }}}
                }))),
            ];
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    /// Producer that always fails with a quota error.
    struct QuotaExhaustedProducer;

    #[async_trait]
    impl EventProducer for QuotaExhaustedProducer {
        async fn stream_events(
            &self,
            _endpoint: &ModelEndpoint,
        ) -> Result<EventStream, ProducerError> {
            Err(ProducerError::new(
                ProducerErrorKind::ResourceExhausted,
                "429 rate limited",
            ))
        }
    }

    #[tokio::test]
    async fn test_run_produces_exactly_one_output() {
        let session = ReviewSession::new(config());
        let outcome = session
            .run(&request(), Arc::new(StateDeltaProducer))
            .await
            .expect("outcome");

        assert_eq!(outcome.output.summary, "LGTM");
        assert_eq!(outcome.output.overall_status, OverallStatus::Approved);
        assert_eq!(outcome.output.metrics.files_reviewed, 2);
        assert!(outcome.fallbacks.is_empty());
    }

    #[tokio::test]
    async fn test_run_stamps_performance_and_usage() {
        let session = ReviewSession::new(config());
        let outcome = session
            .run(&request(), Arc::new(StateDeltaProducer))
            .await
            .expect("outcome");

        let perf = &outcome.output.performance;
        assert_eq!(perf.chunks_received, 2);
        assert_eq!(perf.agents_used, 1);
        assert!(perf.input_tokens > 0);
        assert!(perf.tokens_used >= perf.input_tokens);

        let usage = &outcome.output.model_usage;
        assert!(!usage.used_fallback);
        assert_eq!(usage.agents["reviewer"].model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_quota_exhaustion_everywhere_returns_explicit_result() {
        let session = ReviewSession::new(config());
        let outcome = session
            .run(&request(), Arc::new(QuotaExhaustedProducer))
            .await
            .expect("explicit result, not an error");

        assert!(outcome.output.summary.contains("RESOURCE_EXHAUSTED"));
        assert_eq!(outcome.output.overall_status, OverallStatus::Comment);
        // The fallback switch was still recorded before the second failure.
        assert_eq!(outcome.fallbacks.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_success_annotates_summary() {
        /// Quota error on primary, clean structured output on secondary.
        struct FlakyPrimary;

        #[async_trait]
        impl EventProducer for FlakyPrimary {
            async fn stream_events(
                &self,
                endpoint: &ModelEndpoint,
            ) -> Result<EventStream, ProducerError> {
                if endpoint.name == "gemini-2.5-pro" {
                    return Err(ProducerError::new(
                        ProducerErrorKind::ResourceExhausted,
                        "quota",
                    ));
                }
                let events: Vec<Result<RawEvent, ProducerError>> = vec![Ok(RawEvent::from_value(json!({
                    "actions": {"state_delta": {"code_review_output": {
                        "summary": "Reviewed on fallback",
                        "overall_status": "COMMENT"
                    }}}
                })))];
                Ok(Box::pin(futures::stream::iter(events)))
            }
        }

        let session = ReviewSession::new(config());
        let outcome = session
            .run(&request(), Arc::new(FlakyPrimary))
            .await
            .expect("outcome");

        assert!(outcome.output.summary.starts_with("Reviewed on fallback"));
        assert!(outcome.output.summary.contains("fallback models"));
        assert!(outcome.output.model_usage.used_fallback);
        assert_eq!(outcome.fallbacks.len(), 1);
        assert_eq!(outcome.fallbacks[0].primary, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_non_retryable_error_bubbles() {
        struct BrokenProducer;

        #[async_trait]
        impl EventProducer for BrokenProducer {
            async fn stream_events(
                &self,
                _endpoint: &ModelEndpoint,
            ) -> Result<EventStream, ProducerError> {
                Err(ProducerError::new(
                    ProducerErrorKind::InvalidArgument,
                    "malformed payload",
                ))
            }
        }

        let session = ReviewSession::new(config());
        let result = session.run(&request(), Arc::new(BrokenProducer)).await;
        let err = result.expect_err("should fail");
        assert!(err.to_string().contains("reviewer"));
    }
}
