//! Testing infrastructure shared by the VEI workspace's integration tests.
//!
//! - `TestWorld`: fluent interface for declarative simulation setup
//! - `assertions`: readable checks over observation/state JSON
//! - `fixtures`: scenario builders and the shared default scenario

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use fixtures::{ScenarioBuilder, default_scenario};
pub use world::{TestWorld, TestWorldBuilder};
