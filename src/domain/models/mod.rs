//! Domain models: pure data, no I/O.

pub mod config;
pub mod endpoint;
pub mod event;
pub mod review;
pub mod session;

pub use config::{Config, FallbackConfig, LoggingConfig, RetryConfig, StreamConfig};
pub use endpoint::{EndpointRole, FallbackRecord, ModelEndpoint};
pub use event::{
    AttemptEvent, AttemptId, EventActions, EventCandidate, EventContent, EventPart,
    NormalizedEvent, RawEvent, StreamedEvent,
};
pub use review::{
    AgentModelUsage, CommentSeverity, CommentSide, InlineComment, ModelUsage, OverallStatus,
    PerformanceMetrics, ReviewMetrics, ReviewOutput,
};
pub use session::{ModelUsageTracker, SessionState, MODEL_FALLBACKS_KEY};
