use vei_engine::EventBus;
use vei_types::{Payload, Scheduler, Trigger};

/// One externally-scheduled event: an absolute simulation time, a bus
/// target, and a payload (section 10, Scenario DSL "triggers"; section 11,
/// "C13").
#[derive(Debug, Clone)]
pub struct ReplayEvent {
    pub at_ms: u64,
    pub target: String,
    pub payload: Payload,
}

impl From<Trigger> for ReplayEvent {
    fn from(trigger: Trigger) -> Self {
        let payload = match trigger.payload {
            serde_json::Value::Object(map) => map,
            _ => Payload::new(),
        };
        ReplayEvent { at_ms: trigger.at_ms, target: trigger.target, payload }
    }
}

/// Loads external datasets into the bus as scheduled events (section 11).
/// An event whose `at_ms` has already passed is clamped to "now" rather
/// than scheduled at a negative offset.
pub struct ReplayAdapter;

impl ReplayAdapter {
    pub fn load(events: Vec<ReplayEvent>, bus: &mut EventBus) {
        for event in events {
            let dt_ms = event.at_ms.saturating_sub(bus.clock_ms());
            bus.schedule(dt_ms, &event.target, event.payload);
        }
    }
}
