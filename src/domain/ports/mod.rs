//! Ports: trait seams the infrastructure implements.

pub mod producer;

pub use producer::{EventProducer, EventStream, ProducerError, ProducerErrorKind};
