//! Infrastructure layer: configuration, logging, and adapters.

pub mod config;
pub mod logging;
pub mod replay;

pub use config::{ConfigError, ConfigLoader};
pub use logging::Logger;
pub use replay::ReplayProducer;
