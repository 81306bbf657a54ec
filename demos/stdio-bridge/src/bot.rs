//! In-memory stand-in for a connected game bot.

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use action_runtime::bridge::SessionObserver;
use action_runtime::kernel::Session;
use serde_json::{Value, json};

const EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct BotState {
    position: [i64; 3],
    inventory: BTreeMap<String, u64>,
}

/// Simulated bot session shared by the demo actions.
#[derive(Default)]
pub struct DemoBot {
    state: Mutex<BotState>,
    events: Mutex<VecDeque<Value>>,
}

impl DemoBot {
    pub fn position(&self) -> [i64; 3] {
        self.state.lock().expect("bot state poisoned").position
    }

    pub fn teleport(&self, target: [i64; 3]) {
        self.state.lock().expect("bot state poisoned").position = target;
        self.record(json!({ "kind": "moved", "position": target }));
    }

    pub fn collect(&self, item: &str, count: u64) -> u64 {
        let total = {
            let mut state = self.state.lock().expect("bot state poisoned");
            let slot = state.inventory.entry(item.to_owned()).or_default();
            *slot += count;
            *slot
        };
        self.record(json!({ "kind": "collected", "item": item, "count": count }));
        total
    }

    pub fn record(&self, event: Value) {
        let mut events = self.events.lock().expect("bot events poisoned");
        if events.len() == EVENT_CAPACITY {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl Session for DemoBot {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl SessionObserver for DemoBot {
    fn state_snapshot(&self) -> Value {
        let state = self.state.lock().expect("bot state poisoned");
        json!({
            "position": state.position,
            "inventory": state.inventory,
        })
    }

    fn recent_events(&self, limit: usize) -> Vec<Value> {
        let events = self.events.lock().expect("bot events poisoned");
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }
}
