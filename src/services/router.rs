//! Endpoint routing with sticky quota fallback.
//!
//! One router is owned by exactly one invocation. It starts on the primary
//! endpoint and, after the first quota-classified failure, switches to the
//! secondary for the remainder of that invocation.

use serde::{Deserialize, Serialize};

use crate::domain::models::{EndpointRole, FallbackRecord, ModelEndpoint};
use crate::domain::ports::{ProducerError, ProducerErrorKind};

/// Error-string fragments that indicate token/quota exhaustion.
const QUOTA_INDICATORS: &[&str] = &[
    "RESOURCE_EXHAUSTED",
    "429",
    "QUOTA_EXCEEDED",
    "RATE_LIMIT",
    "TOKEN_LIMIT",
    "CONTEXT_LENGTH",
    "MAX_TOKENS",
    "OUT_OF_TOKENS",
    "QUOTA",
];

/// Kinds treated as transient model unavailability by [`is_model_error`].
const MODEL_ERROR_KINDS: &[ProducerErrorKind] = &[
    ProducerErrorKind::ServiceUnavailable,
    ProducerErrorKind::InternalServerError,
    ProducerErrorKind::DeadlineExceeded,
    ProducerErrorKind::ModelOverloaded,
    ProducerErrorKind::Aborted,
];

/// Message keywords that mark a transient model failure.
const MODEL_ERROR_KEYWORDS: &[&str] = &[
    "unavailable",
    "overloaded",
    "internal error",
    "deadline",
    "try again",
];

/// Maximum wrapped-cause depth inspected by [`is_model_error`].
const MAX_CAUSE_DEPTH: usize = 5;

/// Check whether an error indicates token/quota exhaustion.
///
/// Matches the uppercased message and kind name against a fixed vocabulary
/// with substring semantics. Pure and idempotent; unknown errors classify
/// as non-retryable.
pub fn is_quota_error(err: &ProducerError) -> bool {
    let message = err.message().to_uppercase();
    let kind_name = err.kind().name();

    QUOTA_INDICATORS
        .iter()
        .any(|indicator| message.contains(indicator) || kind_name.contains(indicator))
}

/// Stricter classifier for transient model unavailability.
///
/// Used by the outer retry path rather than the fallback router. An error
/// qualifies when its kind is in the fixed transient set, when its lowered
/// message carries a transient keyword, or when a wrapped cause within 5
/// levels has a transient kind.
pub fn is_model_error(err: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(producer_err) = err.downcast_ref::<ProducerError>() {
        if MODEL_ERROR_KINDS.contains(&producer_err.kind()) {
            return true;
        }
    }

    let message = err.to_string().to_lowercase();
    if MODEL_ERROR_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
    {
        return true;
    }

    has_model_error_cause(err, 0)
}

fn has_model_error_cause(err: &(dyn std::error::Error + 'static), depth: usize) -> bool {
    if depth >= MAX_CAUSE_DEPTH {
        return false;
    }
    let Some(cause) = err.source() else {
        return false;
    };
    if let Some(producer_err) = cause.downcast_ref::<ProducerError>() {
        if MODEL_ERROR_KINDS.contains(&producer_err.kind()) {
            return true;
        }
    }
    has_model_error_cause(cause, depth + 1)
}

/// Snapshot of which endpoint an invocation ended up using.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterUsage {
    /// Endpoint that served the invocation
    pub model: String,
    /// Configured primary endpoint
    pub primary_model: String,
    /// Configured secondary endpoint
    pub secondary_model: String,
    /// Whether the invocation fell back
    pub used_fallback: bool,
}

/// Routes one invocation between a primary and a secondary endpoint.
#[derive(Debug)]
pub struct EndpointRouter {
    agent: String,
    primary: ModelEndpoint,
    secondary: ModelEndpoint,
    fallback_enabled: bool,
    used_fallback: bool,
    last_endpoint: Option<EndpointRole>,
}

impl EndpointRouter {
    /// Create a router for `agent`.
    ///
    /// When `secondary` is `None` the paired fallback for the primary is
    /// selected automatically.
    pub fn new(
        agent: impl Into<String>,
        primary: ModelEndpoint,
        secondary: Option<ModelEndpoint>,
        fallback_enabled: bool,
    ) -> Self {
        let secondary = secondary.unwrap_or_else(|| primary.fallback());
        Self {
            agent: agent.into(),
            primary,
            secondary,
            fallback_enabled,
            used_fallback: false,
            last_endpoint: None,
        }
    }

    /// Endpoint the next attempt should use.
    pub const fn active_endpoint(&self) -> &ModelEndpoint {
        if self.used_fallback {
            &self.secondary
        } else {
            &self.primary
        }
    }

    /// Role of the endpoint the next attempt should use.
    pub const fn active_role(&self) -> EndpointRole {
        if self.used_fallback {
            EndpointRole::Secondary
        } else {
            EndpointRole::Primary
        }
    }

    /// Whether this error should switch the invocation to the secondary.
    pub fn should_fallback(&self, err: &ProducerError) -> bool {
        self.fallback_enabled && is_quota_error(err)
    }

    /// Mark the sticky switch to the secondary endpoint. Idempotent.
    pub fn record_fallback(&mut self) {
        if !self.used_fallback {
            self.used_fallback = true;
            self.last_endpoint = Some(EndpointRole::Secondary);
            tracing::warn!(
                agent = %self.agent,
                primary = %self.primary,
                secondary = %self.secondary,
                "falling back to secondary endpoint due to token/quota limits"
            );
        }
    }

    /// Note which role actually served the most recent attempt.
    pub fn mark_attempt(&mut self, role: EndpointRole) {
        self.last_endpoint = Some(role);
    }

    pub const fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    pub const fn last_endpoint(&self) -> Option<EndpointRole> {
        self.last_endpoint
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub const fn primary(&self) -> &ModelEndpoint {
        &self.primary
    }

    pub const fn secondary(&self) -> &ModelEndpoint {
        &self.secondary
    }

    /// Record for the session fallback log.
    pub fn fallback_record(&self) -> FallbackRecord {
        FallbackRecord {
            agent: self.agent.clone(),
            primary: self.primary.name.clone(),
            fallback: self.secondary.name.clone(),
        }
    }

    /// Usage snapshot for telemetry.
    pub fn usage_info(&self) -> RouterUsage {
        RouterUsage {
            model: self.active_endpoint().name.clone(),
            primary_model: self.primary.name.clone(),
            secondary_model: self.secondary.name.clone(),
            used_fallback: self.used_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota_err() -> ProducerError {
        ProducerError::new(ProducerErrorKind::Unknown, "RESOURCE_EXHAUSTED: 429")
    }

    fn router() -> EndpointRouter {
        EndpointRouter::new(
            "reviewer",
            ModelEndpoint::new("gemini-2.5-pro"),
            None,
            true,
        )
    }

    #[test]
    fn test_quota_error_by_message() {
        assert!(is_quota_error(&quota_err()));
        assert!(is_quota_error(&ProducerError::new(
            ProducerErrorKind::Unknown,
            "exceeded QUOTA for project"
        )));
    }

    #[test]
    fn test_quota_error_by_kind_name() {
        // Empty message: classification rides on the kind name alone.
        assert!(is_quota_error(&ProducerError::new(
            ProducerErrorKind::RateLimited,
            ""
        )));
        assert!(is_quota_error(&ProducerError::new(
            ProducerErrorKind::TokenLimit,
            ""
        )));
    }

    #[test]
    fn test_non_quota_error() {
        assert!(!is_quota_error(&ProducerError::new(
            ProducerErrorKind::InvalidArgument,
            "ValueError: bad argument"
        )));
    }

    #[test]
    fn test_quota_classifier_is_idempotent() {
        let err = quota_err();
        assert_eq!(is_quota_error(&err), is_quota_error(&err));
    }

    #[test]
    fn test_model_error_by_kind() {
        let err = ProducerError::new(ProducerErrorKind::ServiceUnavailable, "503");
        assert!(is_model_error(&err));
    }

    #[test]
    fn test_model_error_by_keyword() {
        let err = ProducerError::new(ProducerErrorKind::Unknown, "model is overloaded");
        assert!(is_model_error(&err));
    }

    #[test]
    fn test_model_error_by_wrapped_cause() {
        let inner = ProducerError::new(ProducerErrorKind::DeadlineExceeded, "rpc timeout");
        let mid = ProducerError::new(ProducerErrorKind::Unknown, "wrapped once").with_source(inner);
        let outer = ProducerError::new(ProducerErrorKind::Unknown, "wrapped twice").with_source(mid);
        assert!(is_model_error(&outer));
    }

    #[test]
    fn test_model_error_cause_depth_capped() {
        // Transient cause buried 6 levels deep stays out of reach.
        let mut err = ProducerError::new(ProducerErrorKind::ServiceUnavailable, "root");
        for i in 0..6 {
            err = ProducerError::new(ProducerErrorKind::Unknown, format!("level {i}"))
                .with_source(err);
        }
        assert!(!is_model_error(&err));
    }

    #[test]
    fn test_non_model_error() {
        let err = ProducerError::new(ProducerErrorKind::InvalidArgument, "bad request");
        assert!(!is_model_error(&err));
    }

    #[test]
    fn test_active_endpoint_before_fallback() {
        let router = router();
        assert_eq!(router.active_endpoint().name, "gemini-2.5-pro");
        assert_eq!(router.active_role(), EndpointRole::Primary);
    }

    #[test]
    fn test_active_endpoint_after_fallback_is_sticky() {
        let mut router = router();
        router.record_fallback();
        assert_eq!(
            router.active_endpoint().name,
            "publishers/google/models/llama-4"
        );
        assert_eq!(router.active_role(), EndpointRole::Secondary);
    }

    #[test]
    fn test_record_fallback_is_idempotent() {
        let mut router = router();
        router.record_fallback();
        let usage_once = router.usage_info();
        router.record_fallback();
        assert_eq!(router.usage_info(), usage_once);
    }

    #[test]
    fn test_should_fallback_requires_enabled_flag() {
        let disabled = EndpointRouter::new(
            "reviewer",
            ModelEndpoint::new("gemini-2.5-pro"),
            None,
            false,
        );
        assert!(!disabled.should_fallback(&quota_err()));
        assert!(router().should_fallback(&quota_err()));
    }

    #[test]
    fn test_should_fallback_rejects_non_quota() {
        let err = ProducerError::new(ProducerErrorKind::InvalidArgument, "bad payload");
        assert!(!router().should_fallback(&err));
    }

    #[test]
    fn test_usage_info_reflects_fallback() {
        let mut router = router();
        assert_eq!(router.usage_info().model, "gemini-2.5-pro");
        router.record_fallback();
        let usage = router.usage_info();
        assert!(usage.used_fallback);
        assert_eq!(usage.model, "publishers/google/models/llama-4");
        assert_eq!(usage.primary_model, "gemini-2.5-pro");
    }
}
