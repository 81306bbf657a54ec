//! Tool invocation bridge for the bot action runtime.
//!
//! The bridge turns discovered [`ToolSpec`](action_registry::ToolSpec)s and a
//! handful of built-in tools into externally callable operations. Each call is
//! resolved, optionally authorized, checked against session readiness, mapped
//! into action parameters and driven through the scheduler; the outcome is
//! encoded as a [`ToolEnvelope`] carrying a request id, elapsed time and a
//! stable error code.

#![warn(missing_docs, clippy::pedantic)]

mod bridge;
mod builtins;
pub mod envelope;
pub mod mapping;
pub mod policy;
pub mod session;

pub use bridge::{BridgeConfig, CallOptions, ToolBridge, ToolDescriptor};
pub use builtins::BuiltinTool;
pub use envelope::{EnvelopeErrorCode, ToolEnvelope};
pub use mapping::{default_mapper, map_input};
pub use policy::{
    AccessDecision, AllowAllAuthorizer, AuthError, AuthRequest, AuthResult, Authorizer,
    TokenAuthorizer, ToolAccessPolicy,
};
pub use session::{SessionObserver, SessionProvider, SharedSession};
