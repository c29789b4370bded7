//! Observability wiring for the posting engine.

pub mod tracing;

pub use tracing::init;
