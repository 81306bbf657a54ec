//! Tools that are always available regardless of discovery.

use action_kernel::ActionScheduler;
use serde_json::{Value, json};

use crate::bridge::CallFailure;
use crate::envelope::EnvelopeErrorCode;
use crate::session::SessionObserver;

const DEFAULT_EVENT_LIMIT: usize = 20;

/// Built-in tool served by the bridge itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    /// Liveness probe with queue status.
    Health,
    /// Snapshot of the session state.
    GetState,
    /// Most recent session events.
    ListEvents,
}

impl BuiltinTool {
    /// Every built-in, in listing order.
    pub const ALL: [Self; 3] = [Self::Health, Self::GetState, Self::ListEvents];

    /// Looks a built-in up by tool name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Returns the tool name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::GetState => "get_state",
            Self::ListEvents => "list_events",
        }
    }

    /// Returns the tool description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Health => "Check that the bot session is alive and report scheduler queue status",
            Self::GetState => "Return a snapshot of the bot session state",
            Self::ListEvents => "List the most recent bot session events",
        }
    }

    /// Returns the advertised input schema.
    #[must_use]
    pub fn input_schema(self) -> Value {
        match self {
            Self::Health | Self::GetState => json!({ "type": "object", "properties": {} }),
            Self::ListEvents => json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "default": DEFAULT_EVENT_LIMIT,
                    }
                }
            }),
        }
    }

    pub(crate) fn run(
        self,
        input: &Value,
        scheduler: &ActionScheduler,
        observer: Option<&dyn SessionObserver>,
    ) -> Result<Value, CallFailure> {
        match self {
            Self::Health => {
                let status = scheduler.queue_status();
                Ok(json!({
                    "status": "ok",
                    "queue": {
                        "length": status.length,
                        "is_processing": status.is_processing,
                    },
                    "cancelled": scheduler.is_cancelled(),
                }))
            }
            Self::GetState => Ok(require_observer(observer)?.state_snapshot()),
            Self::ListEvents => {
                let limit = event_limit(input)?;
                let events = require_observer(observer)?.recent_events(limit);
                Ok(json!({ "count": events.len(), "events": events }))
            }
        }
    }
}

fn require_observer(observer: Option<&dyn SessionObserver>) -> Result<&dyn SessionObserver, CallFailure> {
    observer.ok_or_else(|| {
        CallFailure::new(
            EnvelopeErrorCode::ServiceUnavailable,
            "session observation is not configured",
        )
    })
}

fn event_limit(input: &Value) -> Result<usize, CallFailure> {
    let limit = match input {
        Value::Null => return Ok(DEFAULT_EVENT_LIMIT),
        Value::Object(fields) => fields.get("limit").unwrap_or(&Value::Null),
        _ => {
            return Err(CallFailure::new(
                EnvelopeErrorCode::ParameterError,
                "list_events input must be a JSON object",
            ));
        }
    };

    if limit.is_null() {
        return Ok(DEFAULT_EVENT_LIMIT);
    }

    limit
        .as_u64()
        .filter(|limit| *limit > 0)
        .and_then(|limit| usize::try_from(limit).ok())
        .ok_or_else(|| {
            CallFailure::new(
                EnvelopeErrorCode::ParameterError,
                format!("limit must be a positive integer, got {limit}"),
            )
        })
}
