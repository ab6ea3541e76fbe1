use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Payload;

/// One line of `trace.jsonl` (section 6, "Trace file"). `trace_version` is
/// always `1`; kept as a field (not a doc comment) so the scorer can assert
/// on it when reading historical traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    Call {
        trace_version: u32,
        tool: String,
        args: Value,
        response: Value,
        time_ms: u64,
    },
    Event {
        trace_version: u32,
        target: String,
        payload: Payload,
        emitted: bool,
        time_ms: u64,
    },
}

impl TraceRecord {
    pub fn call(tool: impl Into<String>, args: Value, response: Value, time_ms: u64) -> Self {
        TraceRecord::Call {
            trace_version: 1,
            tool: tool.into(),
            args,
            response,
            time_ms,
        }
    }

    pub fn event(target: impl Into<String>, payload: Payload, emitted: bool, time_ms: u64) -> Self {
        TraceRecord::Event {
            trace_version: 1,
            target: target.into(),
            payload,
            emitted,
            time_ms,
        }
    }

    pub fn time_ms(&self) -> u64 {
        match self {
            TraceRecord::Call { time_ms, .. } => *time_ms,
            TraceRecord::Event { time_ms, .. } => *time_ms,
        }
    }
}
