//! Demo action units registered in the `builtin` location.

use std::time::Duration;

use action_registry::{action_unit, submit_tool_specs};
use action_runtime::kernel::SessionHandle;
use action_runtime::primitives::{ActionOutcome, ErrorCode, Params, ParamsSchema};
use action_runtime::registry::{
    Action, ActionError, ActionResult, MappingError, ToolSpec, downcast_session,
};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::bot::DemoBot;

const STEP_DELAY: Duration = Duration::from_millis(5);
const MAX_TRAVEL: Duration = Duration::from_secs(2);

fn schema(fields: &[(&str, &str)], optional: &[(&str, &str)]) -> ParamsSchema {
    let mut schema = ParamsSchema::new();
    for (name, description) in fields {
        schema = schema
            .field(*name, *description)
            .unwrap_or_else(|err| panic!("static schema field `{name}`: {err}"));
    }
    for (name, description) in optional {
        schema = schema
            .optional_field(*name, *description)
            .unwrap_or_else(|err| panic!("static schema field `{name}`: {err}"));
    }
    schema
}

fn integer(params: &Params, key: &str) -> ActionResult<i64> {
    params
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ActionError::execution(format!("`{key}` must be an integer")))
}

#[action_unit]
#[derive(Default)]
pub struct MoveTo;

#[async_trait]
impl Action for MoveTo {
    fn name(&self) -> &str {
        "moveTo"
    }

    fn description(&self) -> &str {
        "Walk to the given block coordinates"
    }

    fn params_schema(&self) -> ParamsSchema {
        schema(&[("x", "target x"), ("y", "target y"), ("z", "target z")], &[])
    }

    async fn execute(&self, session: SessionHandle, params: Params) -> ActionResult<ActionOutcome> {
        let bot = downcast_session::<DemoBot>(&session)?;
        let target = [integer(&params, "x")?, integer(&params, "y")?, integer(&params, "z")?];

        let from = bot.position();
        let distance: u64 = from
            .iter()
            .zip(target)
            .map(|(a, b)| a.abs_diff(b))
            .sum();
        let travel = STEP_DELAY
            .saturating_mul(u32::try_from(distance).unwrap_or(u32::MAX))
            .min(MAX_TRAVEL);
        tokio::time::sleep(travel).await;

        bot.teleport(target);
        Ok(ActionOutcome::success(format!("arrived after {distance} blocks"))
            .with_data(json!({ "position": target, "distance": distance })))
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("move_to", "Walk the bot to a coordinate").with_input_schema(json!({
                "type": "object",
                "required": ["x", "y", "z"],
                "properties": {
                    "x": { "type": "integer" },
                    "y": { "type": "integer" },
                    "z": { "type": "integer" },
                }
            })),
        ]
    }
}

#[action_unit]
#[derive(Default)]
pub struct MineBlock;

#[async_trait]
impl Action for MineBlock {
    fn name(&self) -> &str {
        "mineBlock"
    }

    fn description(&self) -> &str {
        "Mine blocks of the given type near the bot"
    }

    fn params_schema(&self) -> ParamsSchema {
        schema(&[("name", "block type")], &[("count", "number of blocks, default 1")])
    }

    async fn execute(&self, session: SessionHandle, params: Params) -> ActionResult<ActionOutcome> {
        let bot = downcast_session::<DemoBot>(&session)?;
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        let count = params.get("count").and_then(Value::as_u64).unwrap_or(1);

        if name == "bedrock" {
            return Ok(ActionOutcome::failure(
                ErrorCode::ExecutionError,
                "bedrock cannot be mined",
            ));
        }

        let total = bot.collect(name, count);
        Ok(ActionOutcome::success(format!("mined {count} {name}"))
            .with_data(json!({ "block": name, "mined": count, "in_inventory": total })))
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::new("mine_block", "Mine blocks by name, e.g. {\"blockName\": \"oak_log\"}")]
    }
}

#[action_unit]
#[derive(Default)]
pub struct Chat;

#[async_trait]
impl Action for Chat {
    fn name(&self) -> &str {
        "chat"
    }

    fn description(&self) -> &str {
        "Send a chat message"
    }

    fn params_schema(&self) -> ParamsSchema {
        schema(&[("message", "text to send")], &[])
    }

    async fn execute(&self, session: SessionHandle, params: Params) -> ActionResult<ActionOutcome> {
        let bot = downcast_session::<DemoBot>(&session)?;
        let message = params.get("message").and_then(Value::as_str).unwrap_or_default();
        bot.record(json!({ "kind": "chat", "message": message }));
        Ok(ActionOutcome::success("message sent"))
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("say", "Say something in chat").with_mapper(|input, _context| {
                let message = match input {
                    Value::String(text) => Some(json!(text)),
                    other => other.get("text").or_else(|| other.get("message")).cloned(),
                }
                .ok_or_else(|| MappingError::invalid("expected a string or an object with `text`"))?;

                let mut params = Params::new();
                params.insert("message".into(), message);
                Ok(params)
            }),
        ]
    }
}

fn shortcuts() -> Vec<ToolSpec> {
    vec![ToolSpec::new("dig", "Dig one block of the given type").for_action("mineBlock")]
}

submit_tool_specs!("builtin", shortcuts);
