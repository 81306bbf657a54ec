//! Execution core that serializes actions against a single bot session.
//!
//! This crate wires the action registry, the startup discovery pass and the
//! priority scheduler together. The scheduler is the only path to the session:
//! it keeps at most one action in flight and turns every failure mode into an
//! [`ActionOutcome`](action_primitives::ActionOutcome).

#![warn(missing_docs, clippy::pedantic)]

mod scheduler;

use std::sync::Arc;

use action_registry::{ActionRegistry, DiscoveryLoader, DiscoverySnapshot};

pub use action_registry::{Session, SessionHandle};
pub use scheduler::{
    ActionScheduler, QueueStatus, SchedulerConfig, SchedulerError, TaskHandle, TaskResult,
};

/// Registry plus scheduler, constructed once by the host.
#[derive(Debug, Clone)]
pub struct ActionKernel {
    registry: Arc<ActionRegistry>,
    scheduler: ActionScheduler,
}

impl ActionKernel {
    /// Creates a kernel over an existing registry.
    #[must_use]
    pub fn new(registry: Arc<ActionRegistry>, config: SchedulerConfig) -> Self {
        let scheduler = ActionScheduler::new(Arc::clone(&registry), config);
        Self {
            registry,
            scheduler,
        }
    }

    /// Creates a kernel whose registry is populated by a discovery pass.
    ///
    /// The returned snapshot is immutable and meant to be handed to the tool
    /// bridge.
    #[must_use]
    pub fn bootstrap(
        loader: &DiscoveryLoader,
        config: SchedulerConfig,
    ) -> (Self, Arc<DiscoverySnapshot>) {
        let registry = Arc::new(ActionRegistry::new());
        let snapshot = loader.discover(&registry);
        (Self::new(registry, config), snapshot)
    }

    /// Returns the action registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }
}
