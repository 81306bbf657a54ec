//! Serves bot tools over stdin/stdout.
//!
//! Each input line is a JSON request such as
//! `{"tool": "mine_block", "input": {"blockName": "oak_log"}, "priority": 1}`;
//! each output line is the resulting envelope. Requests are dispatched as
//! soon as they are read, so queued calls compete by priority and envelopes
//! appear in completion order; match them up by `request_id` or tool result.

mod actions;
mod bot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use action_runtime::bridge::{
    BridgeConfig, CallOptions, EnvelopeErrorCode, SharedSession, TokenAuthorizer, ToolBridge,
    ToolEnvelope,
};
use action_runtime::config::{self, RuntimeConfig};
use action_runtime::kernel::{ActionKernel, SessionHandle};
use action_runtime::registry::DiscoverySnapshot;
use action_runtime::primitives::RequestId;
use action_runtime::telemetry::init_tracing;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;
use tracing::info;

use crate::bot::DemoBot;

#[derive(Debug, Parser)]
#[command(name = "stdio-bridge", about = "Drive a simulated bot through the tool bridge")]
struct Args {
    /// JSON configuration file; `ACTION_CONFIG` is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Discovery locations, overriding the configuration.
    #[arg(long = "location")]
    locations: Vec<String>,

    /// Caller tokens accepted when `bridge.require_auth` is enabled.
    #[arg(long = "token")]
    tokens: Vec<String>,

    /// Print the tool listing and exit.
    #[arg(long)]
    list_tools: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CallRequest {
    tool: String,
    #[serde(default)]
    input: Value,
    priority: Option<i32>,
    timeout_ms: Option<u64>,
    action: Option<String>,
    caller: Option<String>,
}

impl CallRequest {
    fn options(&self) -> CallOptions {
        CallOptions {
            priority: self.priority,
            timeout: self.timeout_ms.map(Duration::from_millis),
            action_override: self.action.clone(),
            caller: self.caller.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(&config.logging.filter);

    let loader = config.discovery_loader();
    let (kernel, snapshot) = ActionKernel::bootstrap(&loader, config.scheduler_config());
    info!(
        actions = kernel.registry().len(),
        tools = snapshot.tool_specs().len(),
        "discovery complete"
    );

    let bot = Arc::new(DemoBot::default());
    let bridge = build_bridge(&kernel, &snapshot, bot, config.bridge_config(), &args.tokens);

    if args.list_tools {
        let mut stdout = tokio::io::stdout();
        let listing = serde_json::to_string_pretty(&bridge.list_tools())?;
        stdout.write_all(listing.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        return Ok(());
    }

    let served = serve(
        Arc::new(bridge),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    let discarded = kernel.scheduler().cancel_all();
    info!(served, discarded, "input closed, scheduler cancelled");
    Ok(())
}

fn build_bridge(
    kernel: &ActionKernel,
    snapshot: &DiscoverySnapshot,
    bot: Arc<DemoBot>,
    config: BridgeConfig,
    tokens: &[String],
) -> ToolBridge {
    let session: SessionHandle = bot.clone();
    ToolBridge::new(
        kernel.scheduler().clone(),
        snapshot,
        Arc::new(SharedSession::with_session(session)),
        config,
    )
    .with_observer(bot)
    .with_authorizer(Arc::new(TokenAuthorizer::new(tokens.iter().cloned())))
}

/// Reads requests until `input` closes, writing one envelope per line.
///
/// Every call runs on its own task; the function returns once all of them
/// have been answered.
async fn serve<R, W>(bridge: Arc<ToolBridge>, input: R, mut output: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut calls = JoinSet::new();
    let mut open = true;
    let mut served = 0;

    while open || !calls.is_empty() {
        tokio::select! {
            line = lines.next_line(), if open => {
                let Some(line) = line.context("failed to read input")? else {
                    open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<CallRequest>(&line) {
                    Ok(request) => {
                        let bridge = Arc::clone(&bridge);
                        calls.spawn(async move {
                            bridge
                                .call_tool(&request.tool, &request.input, request.options())
                                .await
                        });
                    }
                    Err(err) => {
                        let envelope = ToolEnvelope::failure(
                            RequestId::random(),
                            EnvelopeErrorCode::ParameterError,
                            format!("malformed request: {err}"),
                            Duration::ZERO,
                        );
                        write_envelope(&mut output, &envelope).await?;
                        served += 1;
                    }
                }
            }
            Some(joined) = calls.join_next() => {
                let envelope = joined.context("tool call task failed")?;
                write_envelope(&mut output, &envelope).await?;
                served += 1;
            }
        }
    }

    Ok(served)
}

async fn write_envelope<W>(output: &mut W, envelope: &ToolEnvelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(envelope)?;
    encoded.push(b'\n');
    output.write_all(&encoded).await?;
    output.flush().await?;
    Ok(())
}

fn load_config(args: &Args) -> Result<RuntimeConfig> {
    let mut config = match &args.config {
        Some(path) => config::load(Some(path.as_path()))?,
        None => config::load_from_env()?,
    };

    if !args.locations.is_empty() {
        config.discovery.locations.clone_from(&args.locations);
        config.validate()?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    use action_runtime::bridge::SessionObserver;
    use serde_json::json;

    #[tokio::test]
    async fn queued_calls_are_served_by_priority() {
        let config = RuntimeConfig::default();
        let (kernel, snapshot) =
            ActionKernel::bootstrap(&config.discovery_loader(), config.scheduler_config());
        let bot = Arc::new(DemoBot::default());
        let bridge = build_bridge(&kernel, &snapshot, Arc::clone(&bot), config.bridge_config(), &[]);

        let input = concat!(
            r#"{"tool": "move_to", "input": {"x": 40, "y": 0, "z": 0}}"#,
            "\n",
            r#"{"tool": "mine_block", "input": {"name": "dirt"}, "priority": 0}"#,
            "\n",
            "not json\n",
            r#"{"tool": "mine_block", "input": {"name": "diamond_ore"}, "priority": 5}"#,
            "\n",
        );
        let mut output = Vec::new();

        let served = serve(Arc::new(bridge), input.as_bytes(), &mut output)
            .await
            .unwrap();

        assert_eq!(served, 4);
        let envelopes: Vec<ToolEnvelope> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(envelopes.len(), 4);
        assert_eq!(envelopes.iter().filter(|envelope| envelope.ok).count(), 3);
        assert_eq!(envelopes[0].error_code, Some(EnvelopeErrorCode::ParameterError));

        let mined: Vec<Value> = bot
            .recent_events(16)
            .into_iter()
            .filter(|event| event["kind"] == json!("collected"))
            .map(|event| event["item"].clone())
            .collect();
        assert_eq!(mined, [json!("diamond_ore"), json!("dirt")]);
    }
}
