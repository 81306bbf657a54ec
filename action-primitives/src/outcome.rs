//! Uniform result value for action executions.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable failure code attached to an [`ActionOutcome`].
///
/// The well-known variants are synthesized by the runtime itself; action
/// implementations may report their own codes through [`ErrorCode::Other`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    /// No action is registered under the requested name.
    ActionNotFound,
    /// `validate_params` rejected the supplied parameters.
    InvalidParams,
    /// The execution did not settle before its deadline.
    Timeout,
    /// The action failed or panicked while executing.
    ExecutionError,
    /// The scheduler was cancelled before the task started.
    Cancelled,
    /// Code defined by an action implementation.
    Other(String),
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ActionNotFound => "ACTION_NOT_FOUND",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::Timeout => "TIMEOUT",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Other(code) => code,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ACTION_NOT_FOUND" => Self::ActionNotFound,
            "INVALID_PARAMS" => Self::InvalidParams,
            "TIMEOUT" => Self::Timeout,
            "EXECUTION_ERROR" => Self::ExecutionError,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<ErrorCode> for String {
    fn from(value: ErrorCode) -> Self {
        match value {
            ErrorCode::Other(code) => code,
            known => known.as_str().to_owned(),
        }
    }
}

/// Outcome of executing an action.
///
/// Outcomes are values, never errors: timeouts, lookup failures and scheduler
/// faults are all reported through the same shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    success: bool,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorCode>,
}

impl ActionOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    /// Creates a failed outcome carrying the supplied code.
    #[must_use]
    pub fn failure(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(code.into()),
        }
    }

    /// Attaches a data payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns `true` when the action succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the optional data payload.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the failure code, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorCode> {
        self.error.as_ref()
    }

    /// Consumes the outcome and returns its data payload.
    #[must_use]
    pub fn into_data(self) -> Option<Value> {
        self.data
    }
}
