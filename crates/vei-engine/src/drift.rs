use serde_json::{Value, json};
use vei_core::DeterministicRng;
use vei_types::{Payload, Scheduler};

use crate::store::EventStore;

/// Selects the drift job set and cadence factor (section 6, "drift mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftMode {
    Off,
    Light,
    Slow,
    Fast,
    Aggressive,
}

impl DriftMode {
    pub fn parse(s: &str) -> Self {
        match s {
            "light" => DriftMode::Light,
            "slow" => DriftMode::Slow,
            "fast" => DriftMode::Fast,
            "aggressive" => DriftMode::Aggressive,
            _ => DriftMode::Off,
        }
    }
}

#[derive(Debug, Clone)]
struct DriftJob {
    name: String,
    cadence_ms: u64,
    jitter_ms: u64,
    templates: Vec<String>,
}

const BUS_TARGET: &str = "drift";

fn base_jobs() -> Vec<DriftJob> {
    vec![
        DriftJob {
            name: "random_slack_message".to_string(),
            cadence_ms: 60_000,
            jitter_ms: 5_000,
            templates: vec!["heads up, standup moved 15 minutes".to_string(), "anyone know the wifi password?".to_string()],
        },
        DriftJob {
            name: "random_mail".to_string(),
            cadence_ms: 90_000,
            jitter_ms: 8_000,
            templates: vec!["newsletter: industry roundup".to_string(), "calendar invite: all-hands".to_string()],
        },
    ]
}

fn security_job() -> DriftJob {
    DriftJob {
        name: "security_alert".to_string(),
        cadence_ms: 45_000,
        jitter_ms: 10_000,
        templates: vec!["suspicious login detected, review access".to_string()],
    }
}

fn jobs_for_mode(mode: DriftMode) -> Vec<DriftJob> {
    let mut jobs = match mode {
        DriftMode::Off => return Vec::new(),
        DriftMode::Light | DriftMode::Slow => base_jobs()
            .into_iter()
            .map(|mut j| {
                j.cadence_ms /= 2;
                j
            })
            .collect(),
        DriftMode::Fast | DriftMode::Aggressive => base_jobs(),
    };
    if matches!(mode, DriftMode::Fast | DriftMode::Aggressive) {
        jobs.push(security_job());
    }
    jobs
}

/// Background-event scheduler that re-arms itself on delivery (section
/// 4.9, "C9"). A given `(seed, mode)` yields the exact same timeline.
pub struct DriftEngine {
    jobs: Vec<DriftJob>,
    rng: DeterministicRng,
}

impl DriftEngine {
    pub fn new(mode: DriftMode, drift_seed: u32) -> Self {
        Self { jobs: jobs_for_mode(mode), rng: DeterministicRng::new(drift_seed) }
    }

    fn schedule_instance(job: &DriftJob, rng: &mut DeterministicRng, scheduler: &mut dyn Scheduler) {
        let template = job.templates.get(rng.randint(0, job.templates.len() as i64 - 1) as usize).cloned().unwrap_or_default();
        let dt = job.cadence_ms + rng.randint(0, job.jitter_ms as i64) as u64;
        let mut payload = Payload::new();
        payload.insert("drift".to_string(), json!(true));
        payload.insert("drift_job".to_string(), json!(job.name));
        payload.insert("text".to_string(), json!(template));
        scheduler.schedule(dt, BUS_TARGET, payload);
    }

    /// Registers the initial instance of every job. Called once per
    /// simulation, only when `mode != Off`.
    pub fn prime(&mut self, scheduler: &mut dyn Scheduler) {
        for job in self.jobs.clone() {
            Self::schedule_instance(&job, &mut self.rng, scheduler);
        }
    }

    pub fn is_drift_payload(payload: &Value) -> bool {
        payload.get("drift").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Records the delivery and re-arms the same job (section 4.9,
    /// "records a `drift.delivered` state event and re-arms the same job
    /// by scheduling another instance at `+cadence_ms`").
    pub fn handle_delivery(&mut self, payload: &Payload, clock_ms: u64, store: &mut EventStore, scheduler: &mut dyn Scheduler) {
        store.append("drift.delivered", payload.clone(), clock_ms, None);
        let job_name = payload.get("drift_job").and_then(Value::as_str).unwrap_or_default().to_string();
        if let Some(job) = self.jobs.iter().find(|j| j.name == job_name).cloned() {
            Self::schedule_instance(&job, &mut self.rng, scheduler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[test]
    fn off_mode_has_no_jobs() {
        let mut engine = DriftEngine::new(DriftMode::Off, 1);
        let mut bus = EventBus::new(1);
        engine.prime(&mut bus);
        assert_eq!(bus.pending_count(Some(BUS_TARGET)), 0);
    }

    #[test]
    fn aggressive_mode_adds_security_job() {
        let mut engine = DriftEngine::new(DriftMode::Aggressive, 1);
        let mut bus = EventBus::new(1);
        engine.prime(&mut bus);
        assert_eq!(bus.pending_count(Some(BUS_TARGET)), 3);
    }

    #[test]
    fn same_seed_and_mode_produce_the_same_timeline() {
        let mut engine_a = DriftEngine::new(DriftMode::Fast, 4242);
        let mut engine_b = DriftEngine::new(DriftMode::Fast, 4242);
        let mut bus_a = EventBus::new(1);
        let mut bus_b = EventBus::new(1);
        engine_a.prime(&mut bus_a);
        engine_b.prime(&mut bus_b);
        assert_eq!(bus_a.peek_due_time(), bus_b.peek_due_time());
    }

    #[test]
    fn delivery_records_event_and_rearms_the_job() {
        let mut engine = DriftEngine::new(DriftMode::Fast, 1);
        let mut bus = EventBus::new(1);
        let mut store = EventStore::new(None);
        engine.prime(&mut bus);
        bus.advance(200_000);
        let entry = bus.next_if_due().expect("a job should be due");
        engine.handle_delivery(&entry.payload, bus.clock_ms(), &mut store, &mut bus);
        assert_eq!(store.snapshot().drift_deliveries, 1);
        assert!(bus.pending_count(Some(BUS_TARGET)) >= 2);
    }
}
