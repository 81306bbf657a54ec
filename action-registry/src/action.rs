//! The action contract and the session collaborator it runs against.

use std::any::Any;
use std::sync::Arc;

use action_primitives::{ActionOutcome, Params, ParamsSchema};
use async_trait::async_trait;
use thiserror::Error;

use crate::tool_spec::ToolSpec;

/// Live, stateful connection that every action operates against.
///
/// The runtime never inspects a session; it only checks readiness and passes
/// the handle through to actions, which downcast it with [`downcast_session`].
pub trait Session: Send + Sync + 'static {
    /// Returns `true` once the session can accept work.
    fn is_ready(&self) -> bool {
        true
    }

    /// Exposes the concrete session for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to the single session.
pub type SessionHandle = Arc<dyn Session>;

/// Result alias for action execution.
pub type ActionResult<T> = Result<T, ActionError>;

/// Named, pluggable operation with a validate + execute contract.
///
/// Units are constructed once (explicitly or during discovery) and are
/// immutable afterwards; any per-call state lives in `params` or the session.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Declarative description of accepted parameters.
    fn params_schema(&self) -> ParamsSchema;

    /// Returns `true` when `params` is acceptable.
    ///
    /// The default checks that every required schema field is present.
    fn validate_params(&self, params: &Params) -> bool {
        self.params_schema().has_required(params)
    }

    /// Runs the operation against the session.
    async fn execute(&self, session: SessionHandle, params: Params) -> ActionResult<ActionOutcome>;

    /// Tool specs exposing this action to external callers.
    fn tool_specs(&self) -> Vec<ToolSpec> {
        Vec::new()
    }
}

/// Downcasts a session handle to the concrete session type an action expects.
///
/// # Errors
///
/// Returns [`ActionError::SessionMismatch`] when the session is of another type.
pub fn downcast_session<T: Session>(session: &SessionHandle) -> ActionResult<&T> {
    session
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ActionError::SessionMismatch {
            expected: std::any::type_name::<T>(),
        })
}

/// Errors raised by action construction and execution.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action failed while executing.
    #[error("action execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the implementation.
        reason: String,
    },

    /// The session handle was not of the type the action operates on.
    #[error("session is not a `{expected}`")]
    SessionMismatch {
        /// Type name the action expected.
        expected: &'static str,
    },

    /// A discovered unit could not be instantiated.
    #[error("action could not be constructed: {reason}")]
    Construction {
        /// Human-readable reason for the failure.
        reason: String,
    },
}

impl ActionError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates a construction error from the supplied reason.
    #[must_use]
    pub fn construction(reason: impl Into<String>) -> Self {
        Self::Construction {
            reason: reason.into(),
        }
    }
}
