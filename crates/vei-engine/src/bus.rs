use std::cmp::Reverse;
use std::collections::BinaryHeap;

use vei_core::DeterministicRng;
use vei_types::{Payload, Scheduler};

/// One scheduled event: `(due_ms, seq, target, payload)` ordered by
/// `(due_ms asc, seq asc)` (section 4.2). `seq` breaks same-due-time ties
/// in insertion order (section 5, "Ordering guarantees").
#[derive(Debug, Clone)]
pub struct BusEntry {
    pub due_ms: u64,
    pub seq: u64,
    pub target: String,
    pub payload: Payload,
}

impl PartialEq for BusEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}
impl Eq for BusEntry {}

impl PartialOrd for BusEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BusEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

/// The event bus (section 4.2, "C2"). Owns the sole `DeterministicRng`
/// reachable from the call/tick path and the monotonic logical clock.
pub struct EventBus {
    heap: BinaryHeap<Reverse<BusEntry>>,
    clock_ms: u64,
    next_seq: u64,
    rng: DeterministicRng,
}

impl EventBus {
    pub fn new(seed: u32) -> Self {
        Self { heap: BinaryHeap::new(), clock_ms: 0, next_seq: 0, rng: DeterministicRng::new(seed) }
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    /// Temporarily moves the RNG stream out of the bus so a caller can hold
    /// both an owned `&mut DeterministicRng` and a `&mut dyn Scheduler`
    /// borrow of the same bus at once (needed by the router to call
    /// `ToolProvider::call`, which takes both). Pair with `put_rng`.
    pub fn take_rng(&mut self) -> DeterministicRng {
        std::mem::replace(&mut self.rng, DeterministicRng::new(0))
    }

    pub fn put_rng(&mut self, rng: DeterministicRng) {
        self.rng = rng;
    }

    pub fn peek_due_time(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(entry)| entry.due_ms)
    }

    /// Pop and return the head entry if it is due (`due_ms <= clock_ms`).
    pub fn next_if_due(&mut self) -> Option<BusEntry> {
        match self.heap.peek() {
            Some(Reverse(entry)) if entry.due_ms <= self.clock_ms => {
                self.heap.pop().map(|Reverse(entry)| entry)
            }
            _ => None,
        }
    }

    pub fn advance(&mut self, dt_ms: u64) {
        let next = self.clock_ms + dt_ms;
        debug_assert!(next >= self.clock_ms, "clock must never move backward");
        self.clock_ms = next;
    }

    /// Set the clock to exactly `at_ms`, used by `tick` to deliver an event
    /// as-of its own due time (section 5, "Event delivery during `tick`
    /// uses the event's due time as the clock at delivery").
    pub fn set_clock_floor(&mut self, at_ms: u64) {
        debug_assert!(at_ms >= self.clock_ms, "clock must never move backward");
        self.clock_ms = self.clock_ms.max(at_ms);
    }

    pub fn pending_count(&self, target: Option<&str>) -> usize {
        match target {
            None => self.heap.len(),
            Some(target) => self.heap.iter().filter(|Reverse(e)| e.target == target).count(),
        }
    }
}

impl Scheduler for EventBus {
    fn schedule(&mut self, dt_ms: u64, target: &str, payload: Payload) {
        let entry = BusEntry { due_ms: self.clock_ms + dt_ms, seq: self.next_seq, target: target.to_string(), payload };
        self.next_seq += 1;
        self.heap.push(Reverse(entry));
    }

    fn clock_ms(&self) -> u64 {
        self.clock_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Payload {
        let mut p = Payload::new();
        p.insert("x".to_string(), json!(1));
        p
    }

    #[test]
    fn same_due_time_breaks_tie_by_insertion_order() {
        let mut bus = EventBus::new(1);
        bus.schedule(100, "a", payload());
        bus.schedule(100, "b", payload());
        bus.advance(100);
        assert_eq!(bus.next_if_due().unwrap().target, "a");
        assert_eq!(bus.next_if_due().unwrap().target, "b");
    }

    #[test]
    fn next_if_due_returns_none_before_due_time() {
        let mut bus = EventBus::new(1);
        bus.schedule(500, "chat", payload());
        assert!(bus.next_if_due().is_none());
        bus.advance(500);
        assert!(bus.next_if_due().is_some());
    }

    #[test]
    fn pending_count_filters_by_target() {
        let mut bus = EventBus::new(1);
        bus.schedule(10, "chat", payload());
        bus.schedule(10, "mail", payload());
        assert_eq!(bus.pending_count(None), 2);
        assert_eq!(bus.pending_count(Some("chat")), 1);
    }

    #[test]
    fn clock_never_moves_backward_under_set_clock_floor() {
        let mut bus = EventBus::new(1);
        bus.advance(1000);
        bus.set_clock_floor(500);
        assert_eq!(bus.clock_ms(), 1000);
        bus.set_clock_floor(1500);
        assert_eq!(bus.clock_ms(), 1500);
    }
}
