//! Configuration loaders: JSON files layered with environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::debug;

use crate::schema::RuntimeConfig;

/// Prefix shared by every override variable.
pub const ENV_PREFIX: &str = "ACTION_";

const CONFIG_PATH_VAR: &str = "ACTION_CONFIG";

/// Parses a JSON document; missing sections and fields take their defaults.
///
/// # Errors
///
/// Fails on malformed JSON or unknown fields.
pub fn parse_json(source: &str) -> Result<RuntimeConfig> {
    serde_json::from_str(source).context("failed to parse runtime configuration")
}

/// Loads configuration from an optional JSON file plus `ACTION_*` variables.
///
/// A `.env` file in the working directory is honoured when present.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, an override does not parse,
/// or the result does not validate.
pub fn load(path: Option<&Path>) -> Result<RuntimeConfig> {
    if let Ok(dotenv) = dotenvy::dotenv() {
        debug!(path = %dotenv.display(), "loaded environment file");
    }

    load_with(path, |key| std::env::var(key).ok())
}

fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<RuntimeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            parse_json(&source).with_context(|| format!("in {}", path.display()))?
        }
        None => RuntimeConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load`], reading the file path from `ACTION_CONFIG` when set.
///
/// # Errors
///
/// See [`load`].
pub fn load_from_env() -> Result<RuntimeConfig> {
    let _ = dotenvy::dotenv();
    let path = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    load(path.as_deref())
}

/// Applies `ACTION_*` overrides obtained through `lookup`.
///
/// List values are comma separated; `ACTION_BRIDGE_ALLOW` set to an empty
/// string removes the allow list.
///
/// # Errors
///
/// Fails when a numeric or boolean override does not parse.
pub fn apply_env_overrides<F>(config: &mut RuntimeConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

    if let Some(value) = var("SCHEDULER_DEFAULT_TIMEOUT_MS") {
        config.scheduler.default_timeout_ms = parse_var("SCHEDULER_DEFAULT_TIMEOUT_MS", &value)?;
    }
    if let Some(value) = var("BRIDGE_ALLOW") {
        let names = split_list(&value);
        config.bridge.allow = (!names.is_empty()).then_some(names);
    }
    if let Some(value) = var("BRIDGE_DENY") {
        config.bridge.deny = split_list(&value);
    }
    if let Some(value) = var("BRIDGE_CALL_TIMEOUT_MS") {
        config.bridge.call_timeout_ms = parse_var("BRIDGE_CALL_TIMEOUT_MS", &value)?;
    }
    if let Some(value) = var("BRIDGE_DEFAULT_PRIORITY") {
        config.bridge.default_priority = parse_var("BRIDGE_DEFAULT_PRIORITY", &value)?;
    }
    if let Some(value) = var("BRIDGE_REQUIRE_AUTH") {
        config.bridge.require_auth = parse_var("BRIDGE_REQUIRE_AUTH", &value)?;
    }
    if let Some(value) = var("BRIDGE_LOG_SUMMARY_LIMIT") {
        config.bridge.log_summary_limit = parse_var("BRIDGE_LOG_SUMMARY_LIMIT", &value)?;
    }
    if let Some(value) = var("DISCOVERY_LOCATIONS") {
        config.discovery.locations = split_list(&value);
    }
    if let Some(value) = var("LOG") {
        config.logging.filter = value;
    }

    Ok(())
}

fn parse_var<T>(suffix: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value `{value}` for {ENV_PREFIX}{suffix}"))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
