use serde_json::Value;
use vei_core::DeterministicRng;
use vei_types::{Scheduler, ToolSpec};

use crate::McpError;

/// The common contract every domain provider implements (section 4.6).
/// Providers SHOULD return `Ok(DomainError::into_value(..))` for expected
/// domain errors and MUST return `Err(McpError)` for protocol violations.
pub trait ToolProvider: Send {
    /// Tool metadata this provider registers at router construction.
    fn specs(&self) -> Vec<ToolSpec>;

    /// Whether this provider is the one that should handle `tool`.
    fn handles(&self, tool: &str) -> bool;

    /// Execute `tool` with `args`. `rng` is the bus's single RNG stream
    /// (section 4.1: "No other randomness source may be used anywhere in
    /// the core"); `scheduler` lets the provider arm future bus events
    /// (derail messages, vendor replies, clarifying questions, ...).
    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        rng: &mut DeterministicRng,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError>;

    /// The bus-target tag this provider answers to when the router drains
    /// a due event (section 4.7, step 7: "Deliver at most one due event").
    /// Providers with no scheduled deliveries of their own (ERP, CRM,
    /// identity, ...) can leave this as a tag nothing ever schedules to.
    fn domain_tag(&self) -> &'static str;

    /// Apply a delivered bus event to this provider's state. Default is a
    /// no-op for providers that never schedule events against themselves.
    fn deliver(&mut self, _payload: &Value, _rng: &mut DeterministicRng, _scheduler: &mut dyn Scheduler) {}

    /// One-line focus summary for the Observation Builder (section 4.8,
    /// "browser -> `Browser: <title> — <excerpt>`; slack -> last message in
    /// `#procurement`; ..."). `None` means this provider has no focus
    /// summary of its own.
    fn focus_summary(&self) -> Option<String> {
        None
    }

    /// The static action-menu entries this provider contributes when it is
    /// the active focus (section 4.8). Browser overrides this with its
    /// current node's live affordances; most providers return a fixed
    /// schema list.
    fn action_menu(&self) -> Vec<Value> {
        Vec::new()
    }
}
