use serde::{Deserialize, Serialize};

use crate::Payload;

/// An immutable event-store record. Indices are assigned contiguously from
/// zero by the owning `EventStore`; once appended an `Event` is never
/// mutated (section 3, "Event" invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub index: u64,
    pub event_id: String,
    pub kind: String,
    pub payload: Payload,
    pub clock_ms: u64,
}

impl Event {
    pub fn new(index: u64, event_id: String, kind: impl Into<String>, payload: Payload, clock_ms: u64) -> Self {
        Self {
            index,
            event_id,
            kind: kind.into(),
            payload,
            clock_ms,
        }
    }
}
