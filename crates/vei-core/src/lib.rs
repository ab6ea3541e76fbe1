//! Internal infrastructure shared by every higher VEI crate: the
//! deterministic RNG (section 4.1, "C1"), monotonic id helpers, and
//! workspace-directory resolution. Not intended for direct use outside the
//! workspace.

mod ids;
mod path;
mod rng;

pub use ids::IdSequence;
pub use path::resolve_workspace_path;
pub use rng::DeterministicRng;
