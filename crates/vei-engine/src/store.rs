use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vei_types::{Event, Payload};

const TOOL_CALLS_CAP: usize = 200;
const FINDINGS_CAP: usize = 200;

/// The reducer-folded aggregate view over the event log (section 4.4).
/// Bounded tails cap memory growth independent of simulation length
/// (section 5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tool_calls: Vec<Value>,
    pub monitor_findings: Vec<Value>,
    pub policy_findings: Vec<Value>,
    pub drift_deliveries: u64,
    pub counts: HashMap<String, u64>,
}

fn push_bounded(list: &mut Vec<Value>, value: Value, cap: usize) {
    list.push(value);
    if list.len() > cap {
        let overflow = list.len() - cap;
        list.drain(0..overflow);
    }
}

type Reducer = Box<dyn Fn(&mut StateSnapshot, &Event) + Send>;

fn default_reducer(kind: &str) -> Option<Reducer> {
    match kind {
        "tool_calls" => Some(Box::new(|snap: &mut StateSnapshot, ev: &Event| {
            push_bounded(&mut snap.tool_calls, Value::Object(ev.payload.clone()), TOOL_CALLS_CAP);
        })),
        "monitor_findings" => Some(Box::new(|snap: &mut StateSnapshot, ev: &Event| {
            push_bounded(&mut snap.monitor_findings, Value::Object(ev.payload.clone()), FINDINGS_CAP);
        })),
        "policy_findings" => Some(Box::new(|snap: &mut StateSnapshot, ev: &Event| {
            push_bounded(&mut snap.policy_findings, Value::Object(ev.payload.clone()), FINDINGS_CAP);
        })),
        "drift.delivered" => Some(Box::new(|snap: &mut StateSnapshot, _ev: &Event| {
            snap.drift_deliveries += 1;
        })),
        _ => None,
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    index: u64,
    clock_ms: u64,
    data: StateSnapshot,
}

/// The event-sourced state store (section 4.4, "C4"). Owns the append-only
/// log; reducers fold it into a live `StateSnapshot`.
pub struct EventStore {
    base_dir: Option<PathBuf>,
    events: Vec<Event>,
    reducers: Vec<(String, Reducer)>,
    snapshot: StateSnapshot,
    next_index: u64,
}

impl EventStore {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        let mut store = Self { base_dir, events: Vec::new(), reducers: Vec::new(), snapshot: StateSnapshot::default(), next_index: 0 };
        for kind in ["tool_calls", "monitor_findings", "policy_findings", "drift.delivered"] {
            store.reducers.push((kind.to_string(), default_reducer(kind).expect("known kind")));
        }
        store.load();
        store
    }

    fn events_path(&self) -> Option<PathBuf> {
        self.base_dir.as_ref().map(|dir| dir.join("events.jsonl"))
    }

    /// Loads `events.jsonl` at startup. A corrupt or truncated trailing
    /// line is discarded rather than aborting the whole load (section
    /// 4.4, "log-loss tolerance is explicit").
    fn load(&mut self) {
        let Some(path) = self.events_path() else { return };
        let Ok(content) = fs::read_to_string(&path) else { return };
        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        self.next_index = events.last().map(|e| e.index + 1).unwrap_or(0);
        for event in &events {
            Self::apply(&mut self.snapshot, &self.reducers, event);
        }
        self.events = events;
    }

    fn apply(snapshot: &mut StateSnapshot, reducers: &[(String, Reducer)], event: &Event) {
        for (kind, reducer) in reducers {
            if kind == &event.kind {
                reducer(snapshot, event);
            }
        }
    }

    /// Appends one event, folds it through every matching registered
    /// reducer plus an optional per-call reducer, and best-effort persists
    /// it (section 4.4, "Storage writes are best-effort; a write failure
    /// must not abort an append").
    pub fn append(&mut self, kind: &str, payload: Payload, clock_ms: u64, extra_reducer: Option<&Reducer>) -> &Event {
        let index = self.next_index;
        self.next_index += 1;
        let event = Event::new(index, format!("evt-{index}"), kind.to_string(), payload, clock_ms);
        Self::apply(&mut self.snapshot, &self.reducers, &event);
        if let Some(reducer) = extra_reducer {
            reducer(&mut self.snapshot, &event);
        }
        self.persist_append(&event);
        self.events.push(event);
        self.events.last().expect("just pushed")
    }

    fn persist_append(&self, event: &Event) {
        let Some(path) = self.events_path() else { return };
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                eprintln!("vei-engine: state dir create failed: {err}");
                return;
            }
        }
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(err) => {
                eprintln!("vei-engine: event serialize failed: {err}");
                return;
            }
        };
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(mut file) => {
                if let Err(err) = writeln!(file, "{line}") {
                    eprintln!("vei-engine: event append write failed: {err}");
                }
            }
            Err(err) => eprintln!("vei-engine: event append open failed: {err}"),
        }
    }

    pub fn register_reducer(&mut self, kind: impl Into<String>, reducer: Reducer) {
        self.reducers.push((kind.into(), reducer));
        self.snapshot = StateSnapshot::default();
        for event in self.events.clone() {
            Self::apply(&mut self.snapshot, &self.reducers, &event);
        }
    }

    pub fn rebuild_state(&self, upto: Option<u64>) -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();
        for event in &self.events {
            if let Some(upto) = upto {
                if event.index > upto {
                    break;
                }
            }
            Self::apply(&mut snapshot, &self.reducers, event);
        }
        snapshot
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_snapshot(&self, clock_ms: u64) -> std::io::Result<()> {
        let Some(base_dir) = &self.base_dir else { return Ok(()) };
        let dir = base_dir.join("snapshots");
        fs::create_dir_all(&dir)?;
        let index = self.events.last().map(|e| e.index).unwrap_or(0);
        let file = SnapshotFile { index, clock_ms, data: self.snapshot.clone() };
        let path = dir.join(format!("{index:09}.json"));
        let content = serde_json::to_vec_pretty(&file)?;
        fs::write(path, content)
    }

    /// Creates a new store seeded with events `<= snapshot_index` and the
    /// matching reducer state, rooted at a distinct branch directory
    /// (section 4.4, "`branch_from(snapshot, name)`").
    pub fn branch_from(&self, snapshot_index: u64, branch_dir: &Path) -> EventStore {
        let mut branch = EventStore::new(Some(branch_dir.to_path_buf()));
        branch.events = self.events.iter().filter(|e| e.index <= snapshot_index).cloned().collect();
        branch.next_index = branch.events.last().map(|e| e.index + 1).unwrap_or(0);
        branch.snapshot = StateSnapshot::default();
        for event in &branch.events {
            Self::apply(&mut branch.snapshot, &branch.reducers, event);
        }
        for event in &branch.events {
            branch.persist_append(event);
        }
        branch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Payload {
        match v {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    #[test]
    fn append_assigns_contiguous_indices() {
        let mut store = EventStore::new(None);
        let e1 = store.append("tool_calls", payload(json!({"tool": "a"})), 0, None).index;
        let e2 = store.append("tool_calls", payload(json!({"tool": "b"})), 10, None).index;
        assert_eq!((e1, e2), (0, 1));
    }

    #[test]
    fn tool_calls_tail_is_bounded() {
        let mut store = EventStore::new(None);
        for i in 0..250 {
            store.append("tool_calls", payload(json!({"i": i})), 0, None);
        }
        assert_eq!(store.snapshot().tool_calls.len(), TOOL_CALLS_CAP);
        assert_eq!(store.snapshot().tool_calls[0]["i"], 50);
    }

    #[test]
    fn register_reducer_replays_history_retroactively() {
        let mut store = EventStore::new(None);
        store.append("custom.kind", payload(json!({"n": 1})), 0, None);
        store.append("custom.kind", payload(json!({"n": 2})), 0, None);
        store.register_reducer(
            "custom.kind",
            Box::new(|snap: &mut StateSnapshot, _ev: &Event| {
                *snap.counts.entry("custom.kind".to_string()).or_insert(0) += 1;
            }),
        );
        assert_eq!(store.snapshot().counts["custom.kind"], 2);
    }

    #[test]
    fn events_load_tolerates_a_corrupt_trailing_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let good = serde_json::to_string(&Event::new(1, "evt-1".to_string(), "tool_calls".to_string(), payload(json!({})), 0)).unwrap();
        fs::write(&path, format!("{good}\nnot json\n")).unwrap();
        let store = EventStore::new(Some(dir.path().to_path_buf()));
        assert_eq!(store.events().len(), 1);
    }

    #[test]
    fn branch_from_isolates_events_after_the_snapshot_index() {
        let mut store = EventStore::new(None);
        store.append("tool_calls", payload(json!({"n": 1})), 0, None);
        let snap_index = store.append("tool_calls", payload(json!({"n": 2})), 0, None).index;
        store.append("tool_calls", payload(json!({"n": 3})), 0, None);
        let branch_dir = tempfile::tempdir().unwrap();
        let branch = store.branch_from(snap_index, branch_dir.path());
        assert_eq!(branch.events().len(), 2);
    }
}
