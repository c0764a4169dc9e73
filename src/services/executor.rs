//! Routed execution of one streaming producer call.
//!
//! The executor drives the producer on the primary endpoint and forwards
//! every event downstream as it arrives. A quota-classified failure triggers
//! exactly one sticky fallback: the producer is re-invoked from the
//! beginning on the secondary endpoint. Forwarded events carry an
//! [`AttemptId`] so consumers can detect the transition (a restarted
//! producer may re-emit output the consumer already saw).

use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::domain::models::{AttemptEvent, AttemptId, ModelEndpoint, SessionState};
use crate::domain::ports::{EventProducer, ProducerError};

use super::router::{EndpointRouter, RouterUsage};

/// Error raised by a routed execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Non-retryable producer failure; no fallback was attempted.
    #[error("agent {agent} failed on {endpoint}: {source}")]
    Producer {
        /// Agent whose call failed
        agent: String,
        /// Endpoint that served the failed attempt
        endpoint: String,
        /// The producer failure
        #[source]
        source: ProducerError,
    },

    /// Both endpoints failed; carries both causes.
    #[error(
        "agent {agent} failed with both models. Primary ({primary}) error: {primary_error}. \
         Secondary ({secondary}) error: {source}"
    )]
    BothEndpointsFailed {
        /// Agent whose call failed
        agent: String,
        /// Primary endpoint name
        primary: String,
        /// Secondary endpoint name
        secondary: String,
        /// Failure from the primary attempt
        primary_error: ProducerError,
        /// Failure from the fallback attempt
        #[source]
        source: ProducerError,
    },
}

impl ExecutorError {
    /// The producer error of the attempt that ended the invocation.
    pub const fn terminal_cause(&self) -> &ProducerError {
        match self {
            Self::Producer { source, .. } | Self::BothEndpointsFailed { source, .. } => source,
        }
    }
}

/// Outcome of one routed execution.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Total events forwarded downstream, across both attempts
    pub events_forwarded: usize,
    /// Endpoint usage snapshot for telemetry
    pub usage: RouterUsage,
}

/// Wraps one streaming call with the router's retry policy.
///
/// Owns its router: the sticky fallback flag lives and dies with a single
/// invocation and is never shared.
#[derive(Debug)]
pub struct RoutedExecutor {
    router: EndpointRouter,
}

impl RoutedExecutor {
    pub const fn new(router: EndpointRouter) -> Self {
        Self { router }
    }

    /// Run the producer, forwarding each event into `sink` as it arrives.
    ///
    /// On a quota-classified failure the fallback is recorded in `session`
    /// and the producer is re-invoked from the beginning on the secondary
    /// endpoint. Any other failure propagates immediately.
    ///
    /// # Errors
    /// [`ExecutorError::Producer`] for a non-retryable failure;
    /// [`ExecutorError::BothEndpointsFailed`] when the fallback attempt
    /// fails as well.
    pub async fn run(
        mut self,
        producer: Arc<dyn EventProducer>,
        sink: mpsc::UnboundedSender<AttemptEvent>,
        session: Arc<Mutex<SessionState>>,
    ) -> Result<ExecutionSummary, ExecutorError> {
        let primary = self.router.active_endpoint().clone();
        debug!(agent = %self.router.agent(), endpoint = %primary, "starting primary attempt");

        let mut forwarded = 0;
        match stream_attempt(producer.as_ref(), &primary, AttemptId::Primary, &sink).await {
            Ok(count) => {
                forwarded += count;
            }
            Err(primary_error) => {
                if !self.router.should_fallback(&primary_error) {
                    error!(
                        agent = %self.router.agent(),
                        error = %primary_error,
                        "failed with non-quota error"
                    );
                    return Err(ExecutorError::Producer {
                        agent: self.router.agent().to_string(),
                        endpoint: primary.name.clone(),
                        source: primary_error,
                    });
                }

                self.router.record_fallback();
                if let Ok(mut session) = session.lock() {
                    session.record_fallback(&self.router.fallback_record());
                }

                let secondary = self.router.active_endpoint().clone();
                info!(
                    agent = %self.router.agent(),
                    endpoint = %secondary,
                    "retrying with fallback endpoint"
                );

                match stream_attempt(producer.as_ref(), &secondary, AttemptId::Fallback, &sink)
                    .await
                {
                    Ok(count) => {
                        forwarded += count;
                    }
                    Err(fallback_error) => {
                        error!(
                            agent = %self.router.agent(),
                            primary = %primary,
                            secondary = %secondary,
                            primary_error = %primary_error,
                            fallback_error = %fallback_error,
                            "failed with both endpoints"
                        );
                        return Err(ExecutorError::BothEndpointsFailed {
                            agent: self.router.agent().to_string(),
                            primary: primary.name.clone(),
                            secondary: secondary.name.clone(),
                            primary_error,
                            source: fallback_error,
                        });
                    }
                }
            }
        }

        Ok(ExecutionSummary {
            events_forwarded: forwarded,
            usage: self.router.usage_info(),
        })
    }
}

/// Drive one attempt to completion, forwarding events as they arrive.
///
/// Returns the number of events forwarded. A closed sink means the consumer
/// gave up (typically after its timeout); the attempt stops quietly since
/// nobody is reading anymore.
async fn stream_attempt(
    producer: &dyn EventProducer,
    endpoint: &ModelEndpoint,
    attempt: AttemptId,
    sink: &mpsc::UnboundedSender<AttemptEvent>,
) -> Result<usize, ProducerError> {
    let mut stream = producer.stream_events(endpoint).await?;
    let mut forwarded = 0;

    while let Some(item) = stream.next().await {
        let event = item?;
        if sink.send(AttemptEvent { attempt, event }).is_err() {
            debug!(endpoint = %endpoint, forwarded, "consumer hung up, stopping attempt");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}
