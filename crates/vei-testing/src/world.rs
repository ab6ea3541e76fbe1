//! `TestWorld` pattern for declarative integration test setup: a fluent
//! builder that isolates `artifacts_dir`/`state_dir` under a fresh temp
//! directory so concurrent tests never share trace or snapshot files.

use std::path::PathBuf;

use tempfile::TempDir;
use vei_sdk::{EngineConfig, Scenario, Simulation};

use crate::fixtures::default_scenario;

pub struct TestWorldBuilder {
    seed: u32,
    scenario: Scenario,
    drift_mode: String,
    drift_seed: Option<u32>,
    monitors: Vec<String>,
    denied_permissions: Vec<String>,
    erp_error_rate: f64,
    crm_error_rate: f64,
    with_artifacts: bool,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            seed: 42042,
            scenario: default_scenario(),
            drift_mode: "off".to_string(),
            drift_seed: None,
            monitors: Vec::new(),
            denied_permissions: Vec::new(),
            erp_error_rate: 0.05,
            crm_error_rate: 0.05,
            with_artifacts: true,
        }
    }

    /// Overrides the base ERP provider error rate (before fault-profile
    /// scaling). Defaults to the engine's own default of 0.05; tests that
    /// need a deterministic ERP round-trip should set this to `0.0`.
    pub fn erp_error_rate(mut self, rate: f64) -> Self {
        self.erp_error_rate = rate;
        self
    }

    pub fn crm_error_rate(mut self, rate: f64) -> Self {
        self.crm_error_rate = rate;
        self
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn drift_mode(mut self, mode: impl Into<String>) -> Self {
        self.drift_mode = mode.into();
        self
    }

    pub fn drift_seed(mut self, seed: u32) -> Self {
        self.drift_seed = Some(seed);
        self
    }

    pub fn monitors(mut self, monitors: &[&str]) -> Self {
        self.monitors = monitors.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn deny_permission(mut self, permission: impl Into<String>) -> Self {
        self.denied_permissions.push(permission.into());
        self
    }

    /// Skip creating an artifacts directory, leaving `EngineConfig.artifacts_dir`
    /// at `None` (used to exercise the "nothing to score yet" error path).
    pub fn without_artifacts(mut self) -> Self {
        self.with_artifacts = false;
        self
    }

    pub fn build(self) -> TestWorld {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let artifacts_dir: Option<PathBuf> = if self.with_artifacts { Some(temp_dir.path().join("artifacts")) } else { None };

        let config = EngineConfig {
            seed: self.seed,
            artifacts_dir,
            state_dir: Some(temp_dir.path().join("state")),
            drift_mode: self.drift_mode,
            drift_seed: self.drift_seed,
            monitors: self.monitors,
            denied_permissions: self.denied_permissions,
            erp_error_rate: self.erp_error_rate,
            crm_error_rate: self.crm_error_rate,
            ..EngineConfig::default()
        };

        let simulation = Simulation::new(config, self.scenario).expect("failed to construct simulation");
        TestWorld { _temp_dir: temp_dir, simulation }
    }
}

/// A `Simulation` plus the temp directory backing its artifacts/state, kept
/// alive for the life of the test.
pub struct TestWorld {
    _temp_dir: TempDir,
    pub simulation: Simulation,
}

impl TestWorld {
    pub fn builder() -> TestWorldBuilder {
        TestWorldBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_constructs_a_working_simulation() {
        let mut world = TestWorld::builder().seed(1).build();
        let ping = world.simulation.ping();
        assert_eq!(ping["ok"], true);
    }

    #[test]
    fn without_artifacts_leaves_scoring_unavailable() {
        let world = TestWorld::builder().without_artifacts().build();
        assert!(world.simulation.score(vei_sdk::ScoreMode::Email).is_err());
    }
}
