use std::path::Path;

use serde_json::Value;
use vei_engine::{ScoreMode, ScoreReport, Scorer, compile_scenario, load_scenario_source};
use vei_runtime::{EngineConfig, Router};
use vei_types::{Scenario, TraceRecord};

use crate::error::{Error, Result};

/// The public facade over one running simulation (section 6, "Tool call
/// surface"). Wraps a `Router`; every method here is a thin, synchronous
/// pass-through, since the engine itself is single-threaded and runs on a
/// logical clock with no real concurrency or wall-clock I/O to await.
pub struct Simulation {
    router: Router,
}

impl Simulation {
    pub fn new(config: EngineConfig, scenario: Scenario) -> Result<Self> {
        Ok(Self { router: Router::new(config, scenario)? })
    }

    /// Loads a `ScenarioSource` from a JSON or TOML file (chosen by
    /// extension) and compiles it against `config.seed` before
    /// constructing the simulation (section 10, Scenario Compiler).
    pub fn from_scenario_file(config: EngineConfig, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = load_scenario_source(path).map_err(vei_runtime::Error::from)?;
        let scenario = compile_scenario(source, config.seed);
        Self::new(config, scenario)
    }

    pub fn call(&mut self, tool: &str, args: &Value) -> Result<Value> {
        self.router.call(tool, args).map_err(Error::from)
    }

    pub fn observe(&mut self, focus: Option<&str>) -> Value {
        self.router.observe(focus)
    }

    pub fn tick(&mut self, dt_ms: u64) -> Value {
        self.router.tick(dt_ms)
    }

    pub fn pending(&self) -> Value {
        self.router.pending()
    }

    pub fn ping(&self) -> Value {
        self.router.ping()
    }

    pub fn reset(&mut self, seed: Option<u32>) -> Result<()> {
        self.router.reset(seed).map_err(Error::from)
    }

    pub fn state(&self, include_state: bool, tool_tail: Option<usize>, include_receipts: bool) -> Value {
        self.router.state(include_state, tool_tail, include_receipts)
    }

    pub fn help(&self) -> Value {
        self.router.help()
    }

    pub fn act_and_observe(&mut self, tool: &str, args: &Value) -> Value {
        self.router.act_and_observe(tool, args)
    }

    pub fn inject(&mut self, target: &str, payload: Value, dt_ms: Option<u64>) -> Result<()> {
        self.router.inject(target, payload, dt_ms).map_err(Error::from)
    }

    /// Scores the run so far by reading back `trace.jsonl` from the
    /// configured artifacts directory (section 4.11, "C12"; Testable
    /// Properties, "Scorer round-trip"). Requires `EngineConfig.artifacts_dir`
    /// to have been set when this simulation was constructed.
    pub fn score(&self, mode: ScoreMode) -> Result<ScoreReport> {
        let artifacts_dir = self
            .router
            .config()
            .artifacts_dir
            .clone()
            .ok_or_else(|| Error::InvalidInput("score() requires EngineConfig.artifacts_dir to be set".to_string()))?;
        let trace_path = artifacts_dir.join("trace.jsonl");
        let contents =
            std::fs::read_to_string(&trace_path).map_err(|err| Error::NotFound(format!("{}: {err}", trace_path.display())))?;
        let records: Vec<TraceRecord> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| Error::InvalidInput(format!("malformed trace record: {err}")))?;
        Ok(Scorer::new().score(&records, self.router.scenario(), mode))
    }
}
