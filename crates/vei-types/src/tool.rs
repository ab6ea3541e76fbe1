use serde::{Deserialize, Serialize};

/// Metadata describing a registered tool (section 3, "ToolSpec"). Names are
/// unique across the whole registry; registration after router start is
/// forbidden (enforced by `vei_engine::registry::ToolRegistry`, not here —
/// this struct is pure data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub side_effects: Vec<String>,
    pub default_latency_ms: u64,
    pub latency_jitter_ms: u64,
    pub nominal_cost: f64,
    pub fault_probability: f64,
    pub returns_hint: String,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            permissions: Vec::new(),
            side_effects: Vec::new(),
            default_latency_ms: 50,
            latency_jitter_ms: 25,
            nominal_cost: 0.0,
            fault_probability: 0.0,
            returns_hint: String::new(),
        }
    }

    pub fn permissions(mut self, perms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.permissions = perms.into_iter().map(Into::into).collect();
        self
    }

    pub fn side_effects(mut self, effects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.side_effects = effects.into_iter().map(Into::into).collect();
        self
    }

    pub fn latency(mut self, default_ms: u64, jitter_ms: u64) -> Self {
        self.default_latency_ms = default_ms;
        self.latency_jitter_ms = jitter_ms;
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.nominal_cost = cost;
        self
    }

    pub fn fault_probability(mut self, p: f64) -> Self {
        self.fault_probability = p;
        self
    }

    pub fn returns(mut self, hint: impl Into<String>) -> Self {
        self.returns_hint = hint.into();
        self
    }
}
