//! Verdict - Streaming Review Execution Layer
//!
//! Verdict sits between a review workflow and a remote, streaming,
//! generative-model backend. It routes each invocation through a
//! retryable, fallback-capable endpoint policy, consumes the resulting
//! event stream under a bounded timeout, normalizes the loosely-typed
//! events the backend emits, and deterministically collapses everything
//! into exactly one structured review result.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture
//! principles:
//!
//! - **Domain Layer** (`domain`): Pure data models and the producer port
//! - **Service Layer** (`services`): Routing, execution, consumption,
//!   normalization, aggregation, and reconciliation
//! - **Application Layer** (`application`): One review invocation end to end
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging,
//!   and the replay adapter
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use verdict::application::{ReviewRequest, ReviewSession};
//! use verdict::domain::models::Config;
//! use verdict::infrastructure::ReplayProducer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = ReviewSession::new(Config::default());
//!     let producer = ReplayProducer::from_file("dump.jsonl")?;
//!     let request = ReviewRequest {
//!         agent_name: "code_reviewer".to_string(),
//!         primary_model: "gemini-2.5-pro".to_string(),
//!         secondary_model: None,
//!         payload: serde_json::json!({}),
//!     };
//!     let outcome = session.run(&request, Arc::new(producer)).await?;
//!     println!("{}", outcome.output.summary);
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{ReviewRequest, ReviewSession, SessionOutcome};
pub use domain::models::{
    AttemptEvent, AttemptId, Config, FallbackRecord, ModelEndpoint, NormalizedEvent, OverallStatus,
    RawEvent, ReviewOutput, SessionState,
};
pub use domain::ports::{EventProducer, EventStream, ProducerError, ProducerErrorKind};
pub use infrastructure::{ConfigLoader, Logger, ReplayProducer};
pub use services::{
    aggregate, is_model_error, is_quota_error, normalize, reconcile, BoundedStreamConsumer,
    ConsumeError, EndpointRouter, ExecutorError, RetryPolicy, RoutedExecutor,
};
