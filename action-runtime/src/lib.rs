//! Action execution core for tool-driven bot sessions.
//!
//! This facade bundles the runtime crates behind feature flags. Units marked
//! with `#[action_unit]` expand to paths under `action_registry`, so crates
//! defining units depend on `action-registry` directly as well.

#![warn(missing_docs, clippy::pedantic)]

/// Ids, outcomes and parameter schemas.
pub use action_primitives as primitives;

/// Action trait, registry and discovery.
pub use action_registry as registry;

/// Priority scheduler (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use action_kernel as kernel;

/// Tool invocation bridge (enabled by `bridge` feature).
#[cfg(feature = "bridge")]
pub use action_bridge as bridge;

/// Runtime configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use action_config as config;

/// Tracing setup and payload summaries (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use action_telemetry as telemetry;
