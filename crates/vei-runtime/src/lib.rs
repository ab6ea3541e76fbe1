//! The router (C11), the observation builder (C15), the replay adapter
//! (C13), and the ambient configuration/error layers (section 6, section
//! 7) that compose `vei-engine` and `vei-providers` into one runnable
//! simulation. `vei-sdk` is the only crate meant to depend on this one
//! directly.

pub mod config;
pub mod error;
pub mod observation;
pub mod replay;
pub mod router;

pub use config::{EngineConfig, FaultProfile};
pub use error::{Error, Result, warn};
pub use replay::{ReplayAdapter, ReplayEvent};
pub use router::Router;
