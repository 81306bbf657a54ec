//! Tool call pipeline: resolution, authorization, mapping, scheduling, envelope.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use action_kernel::ActionScheduler;
use action_primitives::{ActionOutcome, RequestId};
use action_registry::{DiscoverySnapshot, MapContext, ToolSpec};
use action_telemetry::summarize_json;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::builtins::BuiltinTool;
use crate::envelope::{EnvelopeErrorCode, ToolEnvelope};
use crate::mapping::map_input;
use crate::policy::{AuthRequest, Authorizer, ToolAccessPolicy};
use crate::session::{SessionObserver, SessionProvider};

/// Bridge settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Upper bound on the execution timeout of any call.
    pub call_timeout: Duration,
    /// Priority used when a call does not carry one.
    pub default_priority: i32,
    /// Consult the [`Authorizer`] before every call.
    pub require_auth: bool,
    /// Maximum size of the input summary written to the invocation log.
    pub log_summary_limit: usize,
    /// Filter applied to discovered tools.
    pub policy: ToolAccessPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            default_priority: 0,
            require_auth: false,
            log_summary_limit: 512,
            policy: ToolAccessPolicy::allow_all(),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Scheduling priority; higher runs first.
    pub priority: Option<i32>,
    /// Execution timeout, capped by [`BridgeConfig::call_timeout`].
    pub timeout: Option<Duration>,
    /// Action to run when the tool spec does not bind one.
    pub action_override: Option<String>,
    /// Caller credential handed to the authorizer.
    pub caller: Option<String>,
}

impl CallOptions {
    /// Sets the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the execution timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the fallback action name.
    #[must_use]
    pub fn with_action_override(mut self, action: impl Into<String>) -> Self {
        self.action_override = Some(action.into());
        self
    }

    /// Sets the caller credential.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }
}

/// Listing entry returned by [`ToolBridge::list_tools`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Structured input schema, when the tool advertises one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// `true` for tools served by the bridge itself.
    pub builtin: bool,
}

#[derive(Debug)]
pub(crate) struct CallFailure {
    pub(crate) code: EnvelopeErrorCode,
    pub(crate) message: String,
}

impl CallFailure {
    pub(crate) fn new(code: EnvelopeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

enum Target<'a> {
    Builtin(BuiltinTool),
    Tool(&'a ToolSpec),
}

enum Reply {
    Data(Value),
    Outcome(ActionOutcome),
}

/// Exposes scheduled actions as externally callable tools.
///
/// Every call yields a [`ToolEnvelope`]; no path returns an error.
pub struct ToolBridge {
    scheduler: ActionScheduler,
    sessions: Arc<dyn SessionProvider>,
    observer: Option<Arc<dyn SessionObserver>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    exposed: BTreeMap<String, ToolSpec>,
    filtered: BTreeSet<String>,
    config: BridgeConfig,
}

impl fmt::Debug for ToolBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBridge")
            .field("exposed", &self.exposed.keys().collect::<Vec<_>>())
            .field("filtered", &self.filtered)
            .field("observer_configured", &self.observer.is_some())
            .field("authorizer_configured", &self.authorizer.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ToolBridge {
    /// Creates a bridge over the tools of a discovery snapshot.
    ///
    /// Tools hidden by the access policy are remembered so calls to them are
    /// refused rather than reported unknown. Discovered tools cannot shadow a
    /// built-in; the first spec seen for a tool name wins.
    #[must_use]
    pub fn new(
        scheduler: ActionScheduler,
        snapshot: &DiscoverySnapshot,
        sessions: Arc<dyn SessionProvider>,
        config: BridgeConfig,
    ) -> Self {
        let mut exposed = BTreeMap::new();
        let mut filtered = BTreeSet::new();

        for spec in snapshot.tool_specs() {
            let name = spec.tool_name();
            if BuiltinTool::from_name(name).is_some() {
                warn!(tool = name, "discovered tool shadows a built-in and was ignored");
            } else if !config.policy.permits(name) {
                debug!(tool = name, "tool hidden by access policy");
                filtered.insert(name.to_owned());
            } else if exposed.contains_key(name) {
                debug!(tool = name, "duplicate tool spec skipped");
            } else {
                exposed.insert(name.to_owned(), spec.clone());
            }
        }

        info!(
            exposed = exposed.len(),
            filtered = filtered.len(),
            "tool bridge ready"
        );

        Self {
            scheduler,
            sessions,
            observer: None,
            authorizer: None,
            exposed,
            filtered,
            config,
        }
    }

    /// Installs the observer backing `get_state` and `list_events`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Installs the authorizer consulted when `require_auth` is set.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Returns the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the scheduler calls are executed on.
    #[must_use]
    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    /// Returns `true` when a discovered tool is callable under `name`.
    #[must_use]
    pub fn is_exposed(&self, name: &str) -> bool {
        self.exposed.contains_key(name)
    }

    /// Lists built-ins followed by the exposed discovered tools.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let builtins = BuiltinTool::ALL.into_iter().map(|tool| ToolDescriptor {
            name: tool.name().to_owned(),
            description: tool.description().to_owned(),
            input_schema: Some(tool.input_schema()),
            builtin: true,
        });
        let discovered = self.exposed.values().map(|spec| ToolDescriptor {
            name: spec.tool_name().to_owned(),
            description: spec.description().to_owned(),
            input_schema: spec.input_schema().cloned(),
            builtin: false,
        });
        builtins.chain(discovered).collect()
    }

    /// Invokes a tool and encodes the result.
    pub async fn call_tool(&self, name: &str, input: &Value, options: CallOptions) -> ToolEnvelope {
        let request_id = RequestId::random();
        let started = Instant::now();

        let envelope = match self.dispatch(name, input, &options, request_id).await {
            Ok(Reply::Data(data)) => ToolEnvelope::success(request_id, data, started.elapsed()),
            Ok(Reply::Outcome(outcome)) => {
                ToolEnvelope::from_outcome(request_id, outcome, started.elapsed())
            }
            Err(failure) => ToolEnvelope::failure(
                request_id,
                failure.code,
                failure.message,
                started.elapsed(),
            ),
        };

        self.log_invocation(name, input, &envelope);
        envelope
    }

    async fn dispatch(
        &self,
        name: &str,
        input: &Value,
        options: &CallOptions,
        request_id: RequestId,
    ) -> Result<Reply, CallFailure> {
        let target = self.resolve(name)?;
        self.authorize(name, request_id, options).await?;

        let session = self.sessions.ready_session().ok_or_else(|| {
            CallFailure::new(
                EnvelopeErrorCode::ServiceUnavailable,
                "bot session is not ready",
            )
        })?;

        let spec = match target {
            Target::Builtin(tool) => {
                return tool
                    .run(input, &self.scheduler, self.observer.as_deref())
                    .map(Reply::Data);
            }
            Target::Tool(spec) => spec,
        };

        let context = MapContext::new(name, request_id);
        let params = map_input(spec, input, &context)
            .map_err(|err| CallFailure::new(EnvelopeErrorCode::ParameterError, err.to_string()))?;

        let action = spec
            .action_name()
            .or(options.action_override.as_deref())
            .unwrap_or(name);
        let priority = options.priority.unwrap_or(self.config.default_priority);
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.scheduler.default_timeout())
            .min(self.config.call_timeout);

        let outcome = self
            .scheduler
            .execute(action, session, params, priority, Some(timeout))
            .await;
        Ok(Reply::Outcome(outcome))
    }

    fn resolve(&self, name: &str) -> Result<Target<'_>, CallFailure> {
        if let Some(tool) = BuiltinTool::from_name(name) {
            return Ok(Target::Builtin(tool));
        }
        if let Some(spec) = self.exposed.get(name) {
            return Ok(Target::Tool(spec));
        }
        if self.filtered.contains(name) {
            return Err(CallFailure::new(
                EnvelopeErrorCode::PermissionDenied,
                format!("tool `{name}` is not exposed"),
            ));
        }
        Err(CallFailure::new(
            EnvelopeErrorCode::ExecutionError,
            format!("unknown tool `{name}`"),
        ))
    }

    async fn authorize(
        &self,
        name: &str,
        request_id: RequestId,
        options: &CallOptions,
    ) -> Result<(), CallFailure> {
        if !self.config.require_auth {
            return Ok(());
        }

        let Some(authorizer) = &self.authorizer else {
            return Err(CallFailure::new(
                EnvelopeErrorCode::PermissionDenied,
                "authorization is required but no authorizer is configured",
            ));
        };

        let request = AuthRequest {
            tool_name: name,
            request_id,
            caller: options.caller.as_deref(),
        };
        match authorizer.authorize(&request).await {
            Ok(decision) if decision.is_allow() => Ok(()),
            Ok(decision) => Err(CallFailure::new(
                EnvelopeErrorCode::PermissionDenied,
                decision.reason().unwrap_or("caller is not authorized"),
            )),
            Err(err) => {
                warn!(tool = name, %request_id, error = %err, "authorizer failed");
                Err(CallFailure::new(
                    EnvelopeErrorCode::PermissionDenied,
                    err.to_string(),
                ))
            }
        }
    }

    fn log_invocation(&self, name: &str, input: &Value, envelope: &ToolEnvelope) {
        let input = summarize_json(input, self.config.log_summary_limit);
        if envelope.ok {
            info!(
                tool = name,
                request_id = %envelope.request_id,
                ok = true,
                elapsed_ms = envelope.elapsed_ms,
                input = %input,
                "tool call completed"
            );
        } else {
            warn!(
                tool = name,
                request_id = %envelope.request_id,
                ok = false,
                error_code = envelope.error_code.map_or("", EnvelopeErrorCode::as_str),
                error = envelope.error_message.as_deref().unwrap_or_default(),
                elapsed_ms = envelope.elapsed_ms,
                input = %input,
                "tool call failed"
            );
        }
    }
}
