//! Configuration for the action runtime.
//!
//! [`RuntimeConfig`] is read from JSON, layered with `ACTION_*` environment
//! overrides and validated before the scheduler and bridge are built from it.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{ENV_PREFIX, apply_env_overrides, load, load_from_env, parse_json};
pub use schema::{
    BridgeSection, DiscoverySection, LoggingSection, RuntimeConfig, SchedulerSection,
};
