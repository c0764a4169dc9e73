//! Application layer: use case orchestration.

pub mod review_session;

pub use review_session::{ReviewRequest, ReviewSession, SessionOutcome};
