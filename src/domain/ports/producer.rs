//! Event producer port.
//!
//! The model transport lives behind this trait: given an endpoint, it yields
//! a stream of loosely-typed events and may fail at any point, before or
//! mid-stream. Implementations are external collaborators; tests script
//! them directly.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::models::{ModelEndpoint, RawEvent};

/// Stream of raw events as produced by the backend.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RawEvent, ProducerError>> + Send>>;

/// Failure category reported by a producer.
///
/// The kind name doubles as the error "type name" the classifiers match
/// against, so the wire vocabulary (`RESOURCE_EXHAUSTED`, `429`, …) maps
/// onto it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerErrorKind {
    /// Backend reported resource/token exhaustion
    ResourceExhausted,
    /// Project quota exceeded
    QuotaExceeded,
    /// Request was rate limited (HTTP 429 family)
    RateLimited,
    /// Prompt or completion exceeded the model token limit
    TokenLimit,
    /// Input exceeded the model context length
    ContextLength,
    /// Backend temporarily unavailable
    ServiceUnavailable,
    /// Backend internal error
    InternalServerError,
    /// Call exceeded the backend's own deadline
    DeadlineExceeded,
    /// Model overloaded, retry later
    ModelOverloaded,
    /// Call aborted by the backend
    Aborted,
    /// Request rejected as invalid
    InvalidArgument,
    /// Caller lacks permission for the endpoint
    PermissionDenied,
    /// Anything else
    Unknown,
}

impl ProducerErrorKind {
    /// Stable SCREAMING_SNAKE name, as it appears in backend error strings.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::RateLimited => "RATE_LIMITED",
            Self::TokenLimit => "TOKEN_LIMIT",
            Self::ContextLength => "CONTEXT_LENGTH",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::ModelOverloaded => "MODEL_OVERLOADED",
            Self::Aborted => "ABORTED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Error raised by a producer, before or during streaming.
#[derive(Debug, thiserror::Error)]
#[error("{}: {message}", .kind.name())]
pub struct ProducerError {
    /// Failure category
    kind: ProducerErrorKind,
    /// Message as reported by the backend
    message: String,
    /// Wrapped cause, if the backend surfaced a chain
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProducerError {
    pub fn new(kind: ProducerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a wrapped cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub const fn kind(&self) -> ProducerErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Port for the remote model call.
///
/// One producer per logical agent; the routed executor invokes it with the
/// active endpoint and may invoke it again, from the beginning, on the
/// secondary after a quota failure.
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Start streaming events from the given endpoint.
    ///
    /// # Errors
    /// Fails if the stream cannot be established; mid-stream failures are
    /// yielded as `Err` items by the returned stream.
    async fn stream_events(&self, endpoint: &ModelEndpoint) -> Result<EventStream, ProducerError>;
}
