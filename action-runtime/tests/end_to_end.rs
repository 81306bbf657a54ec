use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use action_registry::{action_unit, submit_tool_specs};
use action_runtime::bridge::{CallOptions, EnvelopeErrorCode, SharedSession, ToolBridge};
use action_runtime::config::RuntimeConfig;
use action_runtime::kernel::{ActionKernel, SchedulerConfig, Session, SessionHandle};
use action_runtime::primitives::{ActionOutcome, ErrorCode, Params, ParamsSchema};
use action_runtime::registry::{
    Action, ActionError, ActionResult, DiscoveryLoader, MapContext, MappingError, ToolSpec,
    downcast_session,
};
use async_trait::async_trait;
use serde_json::{Value, json};

#[derive(Default)]
struct TestBot {
    stalled: AtomicBool,
    attempts: AtomicUsize,
}

impl Session for TestBot {
    fn is_ready(&self) -> bool {
        !self.stalled.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[action_unit(location = "e2e-core")]
#[derive(Default)]
struct MineBlock;

#[async_trait]
impl Action for MineBlock {
    fn name(&self) -> &str {
        "mineBlock"
    }

    fn description(&self) -> &str {
        "Mine the nearest block with the given name"
    }

    fn params_schema(&self) -> ParamsSchema {
        ParamsSchema::new()
            .field("name", "block to mine")
            .expect("schema")
            .optional_field("count", "how many blocks")
            .expect("schema")
    }

    async fn execute(&self, session: SessionHandle, params: Params) -> ActionResult<ActionOutcome> {
        let bot = downcast_session::<TestBot>(&session)?;
        bot.attempts.fetch_add(1, Ordering::SeqCst);
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        Ok(ActionOutcome::failure(
            ErrorCode::ExecutionError,
            format!("no reachable {name} nearby"),
        ))
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::new("mine_block", "Mine blocks near the bot")]
    }
}

#[action_unit(location = "e2e-core", constructor = Crafter::connect)]
struct Crafter {
    recipes: Vec<&'static str>,
}

impl Crafter {
    fn connect() -> Result<Self, String> {
        Ok(Self {
            recipes: vec!["torch", "stick"],
        })
    }
}

fn map_craft_input(input: &Value, _context: &MapContext) -> Result<Params, MappingError> {
    let item = input
        .get("item")
        .and_then(Value::as_str)
        .ok_or_else(|| MappingError::invalid("`item` is required"))?;
    let mut params = Params::new();
    params.insert("recipe".into(), json!(item));
    params.insert("count".into(), input.get("amount").cloned().unwrap_or(json!(1)));
    Ok(params)
}

#[async_trait]
impl Action for Crafter {
    fn name(&self) -> &str {
        "craft"
    }

    fn description(&self) -> &str {
        "Craft an item from inventory materials"
    }

    fn params_schema(&self) -> ParamsSchema {
        ParamsSchema::new()
            .field("recipe", "item to craft")
            .expect("schema")
    }

    async fn execute(&self, _session: SessionHandle, params: Params) -> ActionResult<ActionOutcome> {
        let recipe = params.get("recipe").and_then(Value::as_str).unwrap_or_default();
        if !self.recipes.iter().any(|known| *known == recipe) {
            return Ok(ActionOutcome::failure("UNKNOWN_RECIPE", format!("cannot craft {recipe}")));
        }
        Ok(ActionOutcome::success(format!("crafted {recipe}"))
            .with_data(json!({ "crafted": recipe, "count": params["count"] })))
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("craft", "Craft an item")
                .with_input_schema(json!({ "type": "object", "required": ["item"] }))
                .with_mapper(map_craft_input),
        ]
    }
}

#[action_unit(location = "e2e-core", constructor = Broken::new)]
struct Broken;

impl Broken {
    fn new() -> Result<Self, ActionError> {
        Err(ActionError::construction("missing texture pack"))
    }
}

#[async_trait]
impl Action for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Never constructed"
    }

    fn params_schema(&self) -> ParamsSchema {
        ParamsSchema::new()
    }

    async fn execute(&self, _session: SessionHandle, _params: Params) -> ActionResult<ActionOutcome> {
        Ok(ActionOutcome::success("unreachable"))
    }
}

fn core_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new("dig", "Dig through whatever is ahead").for_action("mineBlock"),
        ToolSpec::new("", "nameless specs are dropped"),
    ]
}

submit_tool_specs!("e2e-core", core_specs);

#[action_unit(location = "e2e-extra")]
#[derive(Default)]
struct Follow;

#[async_trait]
impl Action for Follow {
    fn name(&self) -> &str {
        "follow"
    }

    fn description(&self) -> &str {
        "Follow a player"
    }

    fn params_schema(&self) -> ParamsSchema {
        ParamsSchema::new()
    }

    async fn execute(&self, _session: SessionHandle, _params: Params) -> ActionResult<ActionOutcome> {
        Ok(ActionOutcome::success("following"))
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::new("follow_player", "Follow a player")]
    }
}

#[action_unit(location = "e2e-shadow")]
#[derive(Default)]
struct CautiousMiner;

#[async_trait]
impl Action for CautiousMiner {
    fn name(&self) -> &str {
        "mineBlock"
    }

    fn description(&self) -> &str {
        "Mine only when no mobs are around"
    }

    fn params_schema(&self) -> ParamsSchema {
        ParamsSchema::new()
    }

    async fn execute(&self, _session: SessionHandle, _params: Params) -> ActionResult<ActionOutcome> {
        Ok(ActionOutcome::success("mined carefully"))
    }
}

fn runtime_config(locations: &[&str]) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.discovery.locations = locations.iter().map(|location| (*location).to_owned()).collect();
    config.validate().expect("valid config");
    config
}

struct Stack {
    kernel: ActionKernel,
    bridge: ToolBridge,
    bot: Arc<TestBot>,
    sessions: Arc<SharedSession>,
}

fn stack(config: &RuntimeConfig) -> Stack {
    let loader = config.discovery_loader();
    let (kernel, snapshot) = ActionKernel::bootstrap(&loader, config.scheduler_config());

    let bot = Arc::new(TestBot::default());
    let handle: SessionHandle = bot.clone();
    let sessions = Arc::new(SharedSession::with_session(handle));
    let bridge = ToolBridge::new(
        kernel.scheduler().clone(),
        &snapshot,
        sessions.clone(),
        config.bridge_config(),
    );

    Stack {
        kernel,
        bridge,
        bot,
        sessions,
    }
}

#[test]
fn discovery_stops_after_first_location_with_tools() {
    let loader = DiscoveryLoader::new(["e2e-missing", "e2e-core", "e2e-extra"]);
    let (kernel, snapshot) =
        ActionKernel::bootstrap(&loader, SchedulerConfig::default());
    let report = snapshot.report();

    assert_eq!(report.scanned, ["e2e-core"]);
    assert_eq!(report.stopped_after.as_deref(), Some("e2e-core"));
    assert!(kernel.registry().contains("mineBlock"));
    assert!(kernel.registry().contains("craft"));
    assert!(!kernel.registry().contains("follow"));
    assert!(!kernel.registry().contains("broken"));

    assert!(
        report
            .failures
            .iter()
            .any(|failure| failure.reason.contains("missing texture pack"))
    );

    let mut tools: Vec<_> = snapshot.tool_specs().iter().map(ToolSpec::tool_name).collect();
    tools.sort_unstable();
    assert_eq!(tools, ["craft", "dig", "mine_block"]);

    let mine = snapshot
        .tool_specs()
        .iter()
        .find(|spec| spec.tool_name() == "mine_block")
        .expect("mine_block spec");
    assert_eq!(mine.action_name(), Some("mineBlock"));

    assert!(loader.snapshot().is_some());
}

#[test]
fn earlier_location_wins_name_collisions() {
    let loader = DiscoveryLoader::new(["e2e-shadow", "e2e-core"]);
    let (kernel, snapshot) = ActionKernel::bootstrap(&loader, SchedulerConfig::default());
    let report = snapshot.report();

    assert_eq!(report.scanned, ["e2e-shadow", "e2e-core"]);
    assert_eq!(
        kernel.registry().get("mineBlock").expect("registered").description(),
        "Mine only when no mobs are around"
    );
    assert!(
        report
            .duplicates
            .iter()
            .any(|dup| dup.name == "mineBlock" && dup.location == "e2e-core")
    );
}

#[tokio::test]
async fn failing_mine_call_reports_execution_error() {
    let stack = stack(&runtime_config(&["e2e-core"]));

    let envelope = stack
        .bridge
        .call_tool(
            "mine_block",
            &json!({ "blockName": "dirt554", "count": 1 }),
            CallOptions::default(),
        )
        .await;

    assert!(!envelope.ok);
    assert_eq!(envelope.error_code, Some(EnvelopeErrorCode::ExecutionError));
    assert_eq!(envelope.error_message.as_deref(), Some("no reachable dirt554 nearby"));
    assert_eq!(stack.bot.attempts.load(Ordering::SeqCst), 1);

    let wire = serde_json::to_value(&envelope).expect("serialize");
    assert_eq!(wire["error_code"], json!("execution_error"));
    assert_eq!(wire["request_id"], json!(envelope.request_id.to_string()));
}

#[tokio::test]
async fn bundle_tools_and_custom_mappers_reach_their_actions() {
    let stack = stack(&runtime_config(&["e2e-core"]));

    let crafted = stack
        .bridge
        .call_tool("craft", &json!({ "item": "torch", "amount": 4 }), CallOptions::default())
        .await;
    assert!(crafted.ok);
    assert_eq!(crafted.data, Some(json!({ "crafted": "torch", "count": 4 })));

    let unknown_recipe = stack
        .bridge
        .call_tool("craft", &json!({ "item": "beacon" }), CallOptions::default())
        .await;
    assert_eq!(unknown_recipe.error_code, Some(EnvelopeErrorCode::ExecutionError));

    let unmappable = stack.bridge.call_tool("craft", &json!({}), CallOptions::default()).await;
    assert_eq!(unmappable.error_code, Some(EnvelopeErrorCode::ParameterError));

    let dug = stack
        .bridge
        .call_tool("dig", &json!({ "blockName": "stone" }), CallOptions::default())
        .await;
    assert_eq!(dug.error_message.as_deref(), Some("no reachable stone nearby"));

    let invalid = stack.bridge.call_tool("dig", &json!({}), CallOptions::default()).await;
    assert_eq!(invalid.error_code, Some(EnvelopeErrorCode::ExecutionError));
    assert!(invalid.error_message.unwrap().contains("invalid parameters"));
}

#[tokio::test]
async fn liveness_tracks_session_readiness() {
    let stack = stack(&runtime_config(&["e2e-core"]));

    let healthy = stack.bridge.call_tool("health", &Value::Null, CallOptions::default()).await;
    assert!(healthy.ok);

    stack.bot.stalled.store(true, Ordering::SeqCst);
    let stalled = stack.bridge.call_tool("health", &Value::Null, CallOptions::default()).await;
    assert_eq!(stalled.error_code, Some(EnvelopeErrorCode::ServiceUnavailable));

    stack.sessions.clear();
    let gone = stack
        .bridge
        .call_tool("mine_block", &json!({ "blockName": "dirt" }), CallOptions::default())
        .await;
    assert_eq!(gone.error_code, Some(EnvelopeErrorCode::ServiceUnavailable));
    assert_eq!(stack.bot.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelled_scheduler_refuses_work_until_reset() {
    let stack = stack(&runtime_config(&["e2e-core"]));
    let scheduler = stack.kernel.scheduler();

    scheduler.cancel_all();
    let refused = stack
        .bridge
        .call_tool("craft", &json!({ "item": "stick" }), CallOptions::default())
        .await;
    assert_eq!(refused.error_code, Some(EnvelopeErrorCode::ExecutionError));
    assert_eq!(scheduler.queue_status().length, 0);

    scheduler.reset_cancellation();
    let crafted = stack
        .bridge
        .call_tool("craft", &json!({ "item": "stick" }), CallOptions::default())
        .await;
    assert!(crafted.ok);
}

#[tokio::test]
async fn denied_tools_stay_hidden() {
    let mut config = runtime_config(&["e2e-core"]);
    config.bridge.deny = vec!["dig".into()];
    let stack = stack(&config);

    let names: Vec<_> = stack
        .bridge
        .list_tools()
        .into_iter()
        .map(|tool| tool.name)
        .collect();
    assert!(names.iter().any(|name| name == "craft"));
    assert!(!names.iter().any(|name| name == "dig"));

    let denied = stack.bridge.call_tool("dig", &json!({}), CallOptions::default()).await;
    assert_eq!(denied.error_code, Some(EnvelopeErrorCode::PermissionDenied));
}
