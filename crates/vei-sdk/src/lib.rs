//! Public facade over the VEI simulation core: construct a `Simulation`
//! from a `Scenario` and `EngineConfig`, then drive it with `call`,
//! `observe`, `tick`, `reset`, and `score`. This is the crate external
//! callers (and the end-to-end scenario tests under `tests/`) depend on;
//! everything else in the workspace is an internal implementation detail.

pub mod client;
pub mod error;

pub use client::Simulation;
pub use error::{Error, Result};

// Re-exported so callers never need a direct `vei-engine`/`vei-runtime`/
// `vei-types` dependency just to build a scenario or read a score.
pub use vei_engine::{ScenarioSource, ScoreMode, ScoreReport, compile_scenario, load_scenario_source};
pub use vei_runtime::{EngineConfig, FaultProfile};
pub use vei_types::Scenario;
