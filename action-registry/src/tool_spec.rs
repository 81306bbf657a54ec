//! Externally callable wrappers around registered actions.

use std::fmt;
use std::sync::Arc;

use action_primitives::{Params, RequestId};
use serde_json::Value;
use thiserror::Error;

/// Context handed to input mappers.
#[derive(Debug, Clone)]
pub struct MapContext {
    tool_name: String,
    request_id: RequestId,
}

impl MapContext {
    /// Creates a mapping context for one invocation.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, request_id: RequestId) -> Self {
        Self {
            tool_name: tool_name.into(),
            request_id,
        }
    }

    /// Returns the invoked tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the bridge request identifier.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Errors produced while translating tool input into action parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// The call input is structurally unusable.
    #[error("invalid tool input: {reason}")]
    InvalidInput {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl MappingError {
    /// Creates an invalid-input error from the supplied reason.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Function translating raw tool input into action parameters.
pub type InputMapper = Arc<dyn Fn(&Value, &MapContext) -> Result<Params, MappingError> + Send + Sync>;

/// Externally callable tool bound to an action.
#[derive(Clone)]
pub struct ToolSpec {
    tool_name: String,
    description: String,
    input_schema: Option<Value>,
    action_name: Option<String>,
    mapper: Option<InputMapper>,
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("tool_name", &self.tool_name)
            .field("action_name", &self.action_name)
            .field("has_input_schema", &self.input_schema.is_some())
            .field("has_mapper", &self.mapper.is_some())
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    /// Creates a tool spec with the given name and description.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            description: description.into(),
            input_schema: None,
            action_name: None,
            mapper: None,
        }
    }

    /// Binds the tool to an explicit action name.
    #[must_use]
    pub fn for_action(mut self, action_name: impl Into<String>) -> Self {
        self.action_name = Some(action_name.into());
        self
    }

    /// Attaches a structured input schema advertised to callers.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Installs a custom input mapper.
    #[must_use]
    pub fn with_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Value, &MapContext) -> Result<Params, MappingError> + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the optional input schema.
    #[must_use]
    pub fn input_schema(&self) -> Option<&Value> {
        self.input_schema.as_ref()
    }

    /// Returns the explicitly bound action name, if any.
    #[must_use]
    pub fn action_name(&self) -> Option<&str> {
        self.action_name.as_deref()
    }

    /// Returns the custom input mapper, if any.
    #[must_use]
    pub fn mapper(&self) -> Option<&InputMapper> {
        self.mapper.as_ref()
    }

    /// Returns `true` when both name and description are non-empty.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.tool_name.trim().is_empty() && !self.description.trim().is_empty()
    }

    /// Fills in the action name when the spec does not bind one.
    pub(crate) fn default_action(mut self, action_name: &str) -> Self {
        if self.action_name.is_none() {
            self.action_name = Some(action_name.to_owned());
        }
        self
    }
}
