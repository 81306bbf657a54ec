//! Action registration, tool specs, and startup discovery.
//!
//! Actions are plain trait objects stored in an [`ActionRegistry`]. Crates
//! that contribute actions annotate them with [`action_unit`] (or submit tool
//! spec bundles with [`submit_tool_specs!`]); the [`DiscoveryLoader`] walks
//! the resulting link-time catalog once at startup and hands back an
//! immutable [`DiscoverySnapshot`].

#![warn(missing_docs, clippy::pedantic)]

extern crate self as action_registry;

pub mod action;
pub mod discovery;
pub mod registry;
pub mod tool_spec;

pub use action::{Action, ActionError, ActionResult, Session, SessionHandle, downcast_session};
pub use action_registry_macros::action_unit;
pub use discovery::{
    ActionCatalog, DiscoveryLoader, DiscoveryReport, DiscoverySnapshot, Export, ToolSpecBundle,
    UnitRegistration,
};
pub use registry::{ActionDescriptor, ActionRegistry};
pub use tool_spec::{InputMapper, MapContext, MappingError, ToolSpec};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
