//! Tool exposure filtering and caller authorization.

use std::collections::BTreeSet;

use action_primitives::RequestId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allow/deny filter applied to discovered tools.
///
/// The deny list always wins. Without an allow list every tool that is not
/// denied is exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAccessPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    deny: BTreeSet<String>,
}

impl ToolAccessPolicy {
    /// Creates a policy exposing every tool.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Restricts exposure to the supplied tool names.
    #[must_use]
    pub fn with_allow<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow
            .get_or_insert_with(BTreeSet::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Hides the supplied tool names regardless of the allow list.
    #[must_use]
    pub fn with_deny<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny.extend(names.into_iter().map(Into::into));
        self
    }

    /// Returns the allow list, if one is configured.
    #[must_use]
    pub fn allow(&self) -> Option<&BTreeSet<String>> {
        self.allow.as_ref()
    }

    /// Returns the deny list.
    #[must_use]
    pub fn deny(&self) -> &BTreeSet<String> {
        &self.deny
    }

    /// Returns `true` when the tool may be exposed.
    #[must_use]
    pub fn permits(&self, tool_name: &str) -> bool {
        if self.deny.contains(tool_name) {
            return false;
        }
        self.allow
            .as_ref()
            .is_none_or(|allow| allow.contains(tool_name))
    }
}

/// Request evaluated by an [`Authorizer`].
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// Tool being invoked.
    pub tool_name: &'a str,
    /// Identifier of the call.
    pub request_id: RequestId,
    /// Caller credential supplied with the call, if any.
    pub caller: Option<&'a str>,
}

/// Decision returned by an [`Authorizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl AccessDecision {
    /// Permits the call.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Refuses the call with a reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns `true` when the call may proceed.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        self.allowed
    }

    /// Returns the refusal reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Errors surfaced by authorizer backends.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend could not reach a decision.
    #[error("authorization backend failure: {reason}")]
    Backend {
        /// Human-readable explanation for logging and operators.
        reason: String,
    },
}

/// Result alias for authorization.
pub type AuthResult<T> = Result<T, AuthError>;

/// Decides whether a caller may invoke a tool.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Evaluates the supplied request.
    async fn authorize(&self, request: &AuthRequest<'_>) -> AuthResult<AccessDecision>;
}

/// Authorizer that admits every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize(&self, _request: &AuthRequest<'_>) -> AuthResult<AccessDecision> {
        Ok(AccessDecision::allow())
    }
}

/// Authorizer admitting callers that present one of a fixed set of tokens.
#[derive(Debug, Default, Clone)]
pub struct TokenAuthorizer {
    tokens: BTreeSet<String>,
}

impl TokenAuthorizer {
    /// Creates an authorizer accepting the supplied tokens.
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|token: &String| !token.trim().is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl Authorizer for TokenAuthorizer {
    async fn authorize(&self, request: &AuthRequest<'_>) -> AuthResult<AccessDecision> {
        Ok(match request.caller {
            Some(token) if self.tokens.contains(token) => AccessDecision::allow(),
            Some(_) => AccessDecision::deny("unknown caller token"),
            None => AccessDecision::deny("caller token required"),
        })
    }
}
