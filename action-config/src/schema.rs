//! Strongly typed configuration schema.

use std::collections::BTreeSet;
use std::time::Duration;

use action_bridge::{BridgeConfig, ToolAccessPolicy};
use action_kernel::SchedulerConfig;
use action_registry::DiscoveryLoader;
use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Scheduler settings.
    pub scheduler: SchedulerSection,
    /// Tool bridge settings.
    pub bridge: BridgeSection,
    /// Discovery settings.
    pub discovery: DiscoverySection,
    /// Log output settings.
    pub logging: LoggingSection,
}

/// `scheduler` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    /// Timeout for tasks that do not carry their own.
    pub default_timeout_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}

/// `bridge` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSection {
    /// Tools to expose; `None` exposes every tool not denied.
    pub allow: Option<Vec<String>>,
    /// Tools to hide.
    pub deny: Vec<String>,
    /// Upper bound on a call's execution timeout.
    pub call_timeout_ms: u64,
    /// Priority for calls that do not specify one.
    pub default_priority: i32,
    /// Consult the authorizer on every call.
    pub require_auth: bool,
    /// Size bound of the input summary in the invocation log.
    pub log_summary_limit: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            allow: None,
            deny: Vec::new(),
            call_timeout_ms: 60_000,
            default_priority: 0,
            require_auth: false,
            log_summary_limit: 512,
        }
    }
}

/// `discovery` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySection {
    /// Catalog locations scanned in order.
    pub locations: Vec<String>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            locations: vec!["builtin".to_owned(), "plugins".to_owned()],
        }
    }
}

/// `logging` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Fails on zero timeouts, a summary limit shorter than `...`, an empty or
    /// blank location list, or a tool that is both allowed and denied.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.scheduler.default_timeout_ms > 0,
            "scheduler.default_timeout_ms must be > 0"
        );
        ensure!(
            self.bridge.call_timeout_ms > 0,
            "bridge.call_timeout_ms must be > 0"
        );
        ensure!(
            self.bridge.log_summary_limit >= 3,
            "bridge.log_summary_limit must be >= 3"
        );
        ensure!(
            !self.discovery.locations.is_empty(),
            "discovery.locations must not be empty"
        );
        if self.discovery.locations.iter().any(|location| location.trim().is_empty()) {
            bail!("discovery.locations[] must not be blank");
        }

        if let Some(allow) = &self.bridge.allow {
            let deny: BTreeSet<&str> = self.bridge.deny.iter().map(String::as_str).collect();
            if let Some(name) = allow.iter().find(|name| deny.contains(name.as_str())) {
                bail!("bridge tool `{name}` is listed in both allow and deny");
            }
        }

        Ok(())
    }

    /// Builds the scheduler settings.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(Duration::from_millis(self.scheduler.default_timeout_ms))
    }

    /// Builds the bridge settings, including the tool access policy.
    #[must_use]
    pub fn bridge_config(&self) -> BridgeConfig {
        let mut policy = ToolAccessPolicy::allow_all().with_deny(self.bridge.deny.iter().cloned());
        if let Some(allow) = &self.bridge.allow {
            policy = policy.with_allow(allow.iter().cloned());
        }

        BridgeConfig {
            call_timeout: Duration::from_millis(self.bridge.call_timeout_ms),
            default_priority: self.bridge.default_priority,
            require_auth: self.bridge.require_auth,
            log_summary_limit: self.bridge.log_summary_limit,
            policy,
        }
    }

    /// Builds a loader over the link-time catalog for the configured locations.
    #[must_use]
    pub fn discovery_loader(&self) -> DiscoveryLoader {
        DiscoveryLoader::new(self.discovery.locations.iter().cloned())
    }
}
