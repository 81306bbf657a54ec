//! Observability helpers for the action runtime.

#![warn(missing_docs, clippy::pedantic)]

pub mod summary;
pub mod tracing_support;

pub use summary::summarize_json;
pub use tracing_support::init_tracing;
