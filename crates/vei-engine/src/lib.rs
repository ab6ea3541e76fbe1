//! The simulation engine: the event bus, the trace logger, the
//! event-sourced state store, the tool registry's ranked search, the
//! monitor/policy pipeline, the drift engine, the scenario compiler, and
//! the scorer (section 4, components C2-C5, C7-C10, C12). `vei-runtime`'s
//! router composes these with `vei-providers`' tool providers (C6) into
//! one dispatch pipeline.

pub mod bus;
pub mod drift;
mod error;
pub mod monitors;
pub mod policy;
pub mod registry;
pub mod scenario_compiler;
pub mod scorer;
pub mod store;
pub mod trace_logger;

pub use bus::{BusEntry, EventBus};
pub use drift::{DriftEngine, DriftMode};
pub use error::{Error, Result};
pub use monitors::{Finding, MonitorManager, ToolAwareMonitor};
pub use policy::{PolicyEngine, PolicyFinding};
pub use registry::ToolRegistry;
pub use scenario_compiler::{ScenarioSource, compile as compile_scenario, load_source as load_scenario_source};
pub use scorer::{ScoreMode, ScoreReport, Scorer};
pub use store::{EventStore, StateSnapshot};
pub use trace_logger::TraceLogger;
