//! Wire-level response envelope and error taxonomy.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use action_primitives::{ActionOutcome, ErrorCode, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Error codes surfaced to bridge callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeErrorCode {
    /// The session is missing or not ready.
    ServiceUnavailable,
    /// The tool is filtered out or the caller was not authorized.
    PermissionDenied,
    /// The action failed, or the tool could not be resolved.
    ExecutionError,
    /// The action did not finish before its deadline.
    ExecutionTimeout,
    /// The call input could not be turned into parameters.
    ParameterError,
}

impl EnvelopeErrorCode {
    const ALL: [Self; 5] = [
        Self::ServiceUnavailable,
        Self::PermissionDenied,
        Self::ExecutionError,
        Self::ExecutionTimeout,
        Self::ParameterError,
    ];

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::PermissionDenied => "permission_denied",
            Self::ExecutionError => "execution_error",
            Self::ExecutionTimeout => "execution_timeout",
            Self::ParameterError => "parameter_error",
        }
    }

    /// Parses a wire code, returning `None` for values outside the taxonomy.
    #[must_use]
    pub fn from_wire(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == code)
    }

    /// Maps an outcome error code onto the taxonomy.
    ///
    /// `TIMEOUT` becomes `execution_timeout`; codes already spelled as a
    /// taxonomy value pass through; everything else is `execution_error`.
    #[must_use]
    pub fn from_outcome_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::Timeout => Self::ExecutionTimeout,
            other => Self::from_wire(other.as_str()).unwrap_or(Self::ExecutionError),
        }
    }
}

impl Display for EnvelopeErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response returned for every tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    /// `true` when the call succeeded.
    pub ok: bool,
    /// Result payload of a successful call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<EnvelopeErrorCode>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Identifier generated for the call.
    pub request_id: RequestId,
    /// Wall-clock time spent serving the call.
    pub elapsed_ms: u64,
}

impl ToolEnvelope {
    /// Builds a successful envelope.
    #[must_use]
    pub fn success(request_id: RequestId, data: Value, elapsed: Duration) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error_code: None,
            error_message: None,
            request_id,
            elapsed_ms: millis(elapsed),
        }
    }

    /// Builds a failed envelope.
    #[must_use]
    pub fn failure(
        request_id: RequestId,
        code: EnvelopeErrorCode,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            ok: false,
            data: None,
            error_code: Some(code),
            error_message: Some(message.into()),
            request_id,
            elapsed_ms: millis(elapsed),
        }
    }

    /// Encodes an action outcome.
    ///
    /// Successful outcomes carry their data, or `{ "message": .. }` when the
    /// action returned none.
    #[must_use]
    pub fn from_outcome(request_id: RequestId, outcome: ActionOutcome, elapsed: Duration) -> Self {
        if outcome.is_success() {
            let message = outcome.message().to_owned();
            let data = outcome
                .into_data()
                .unwrap_or_else(|| json!({ "message": message }));
            return Self::success(request_id, data, elapsed);
        }

        let code = outcome
            .error()
            .map_or(EnvelopeErrorCode::ExecutionError, EnvelopeErrorCode::from_outcome_code);
        Self::failure(request_id, code, outcome.message(), elapsed)
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
