//! Shared schemas for the VEI simulation core.
//!
//! This crate holds only data: the event-store record (`Event`), the
//! immutable simulation seed (`Scenario`), tool metadata (`ToolSpec`), the
//! trace envelope (`TraceRecord`), and the per-domain state records that
//! `vei-providers` mutates and `vei-engine`'s reducers fold into
//! `StateSnapshot`. Nothing here talks to the filesystem or owns a clock.

mod error;
mod event;
mod scenario;
mod tool;
mod trace;

pub mod domain;

pub use error::{DomainError, Error, Result};
pub use event::Event;
pub use scenario::{
    BrowserNodeSeed, CalendarEventSeed, DocumentSeed, IdentityGroupSeed, IdentitySeed,
    IdentityUserSeed, ParticipantSeed, Scenario, ServiceDeskSeed, TicketSeed, Trigger, VendorSeed,
};
pub use tool::ToolSpec;
pub use trace::TraceRecord;

/// A key-value payload that crosses the event-bus boundary. Kept neutral
/// (rather than a typed enum per event kind) so new drift jobs, triggers,
/// and replay datasets can carry arbitrary shapes without widening this
/// crate's public surface.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// The bus-facing interface a tool provider needs in order to schedule
/// future events (section 4.6, providers scheduling derail messages,
/// vendor replies, clarifying questions, ...) without depending on
/// `vei-engine`'s concrete `EventBus` type. `vei_engine::bus::EventBus`
/// implements this trait; `vei-providers` only ever sees the trait object.
pub trait Scheduler {
    fn schedule(&mut self, dt_ms: u64, target: &str, payload: Payload);
    fn clock_ms(&self) -> u64;
}
