use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vei_core::DeterministicRng;
use vei_types::domain::browser::BrowserNode;
use vei_types::domain::calendar::CalendarEvent;
use vei_types::domain::docs::Document;
use vei_types::domain::tickets::Ticket;
use vei_types::{IdentitySeed, ParticipantSeed, Scenario, ServiceDeskSeed, Trigger, VendorSeed};

use crate::Error;

/// A number, or an inclusive `[lo, hi]` range to be sampled at compile
/// time (section 6, "vendors (name, price — number or `[lo, hi]`,
/// eta_days likewise...)").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ranged<T> {
    Fixed(T),
    Range([T; 2]),
}

impl Ranged<f64> {
    fn sample(&self, rng: &mut DeterministicRng) -> f64 {
        match self {
            Ranged::Fixed(v) => *v,
            Ranged::Range([lo, hi]) => {
                let t = rng.next_float();
                lo + (hi - lo) * t
            }
        }
    }
}

impl Ranged<u32> {
    fn sample(&self, rng: &mut DeterministicRng) -> u32 {
        match self {
            Ranged::Fixed(v) => *v,
            Ranged::Range([lo, hi]) => rng.randint(*lo as i64, *hi as i64) as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSource {
    pub name: String,
    pub price: Ranged<f64>,
    pub eta_days: Ranged<u32>,
    pub templates: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetSource {
    pub cap_usd: f64,
    pub approval_threshold: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackSource {
    #[serde(default)]
    pub initial_message: Option<String>,
    #[serde(default)]
    pub derail_prob: f64,
    #[serde(default)]
    pub channels: Vec<String>,
}

/// The on-disk form accepted by the compiler (section 10): a
/// `serde`-deserializable structured document, JSON or TOML chosen by
/// file extension, rather than a bespoke textual grammar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSource {
    pub name: String,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub budget: BudgetSource,
    #[serde(default)]
    pub slack: SlackSource,
    #[serde(default)]
    pub vendors: Vec<VendorSource>,
    #[serde(default)]
    pub browser_nodes: HashMap<String, BrowserNode>,
    #[serde(default)]
    pub browser_start: String,
    #[serde(default)]
    pub participants: Vec<ParticipantSeed>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub identity: IdentitySeed,
    #[serde(default)]
    pub service_desk: ServiceDeskSeed,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Deserializes a `ScenarioSource` from `path`, dispatching on extension
/// (`.toml` vs anything else, treated as JSON).
pub fn load_source(path: &Path) -> Result<ScenarioSource, Error> {
    let content = std::fs::read_to_string(path).map_err(vei_types::Error::Io)?;
    if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        toml::from_str(&content).map_err(|err| Error::Config(err.to_string()))
    } else {
        serde_json::from_str(&content).map_err(|err| Error::Types(vei_types::Error::Serde(err)))
    }
}

/// Deterministically samples every ranged field and produces the
/// immutable runtime `Scenario` (section 10, "Compilation deterministically
/// samples price/eta using the provided seed").
pub fn compile(source: ScenarioSource, compile_seed: u32) -> Scenario {
    let mut rng = DeterministicRng::new(source.seed.unwrap_or(compile_seed));
    let vendors = source
        .vendors
        .into_iter()
        .map(|v| VendorSeed { name: v.name, price: v.price.sample(&mut rng), eta_days: v.eta_days.sample(&mut rng), templates: v.templates })
        .collect();

    Scenario {
        name: source.name,
        budget_cap_usd: source.budget.cap_usd,
        approval_threshold_usd: source.budget.approval_threshold,
        derail_probability: source.slack.derail_prob,
        initial_chat_message: source.slack.initial_message,
        slack_channels: source.slack.channels,
        vendors,
        browser_nodes: source.browser_nodes,
        browser_start: source.browser_start,
        participants: source.participants,
        documents: source.documents,
        calendar_events: source.calendar_events,
        tickets: source.tickets,
        triggers: source.triggers,
        identity: source.identity,
        service_desk: source.service_desk,
        metadata: source.metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ScenarioSource {
        ScenarioSource {
            name: "test".to_string(),
            seed: Some(123),
            vendors: vec![VendorSource {
                name: "macrocompute".to_string(),
                price: Ranged::Range([900.0, 1100.0]),
                eta_days: Ranged::Range([3, 7]),
                templates: vec!["{vendor} quotes ${price} eta {eta} days".to_string()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn same_seed_samples_the_same_vendor_price() {
        let a = compile(source(), 1);
        let b = compile(source(), 1);
        assert_eq!(a.vendors[0].price, b.vendors[0].price);
        assert_eq!(a.vendors[0].eta_days, b.vendors[0].eta_days);
    }

    #[test]
    fn sampled_price_stays_within_its_range() {
        let compiled = compile(source(), 1);
        assert!(compiled.vendors[0].price >= 900.0 && compiled.vendors[0].price <= 1100.0);
    }

    #[test]
    fn fixed_values_pass_through_unsampled() {
        let mut src = source();
        src.vendors[0].price = Ranged::Fixed(1234.5);
        let compiled = compile(src, 1);
        assert_eq!(compiled.vendors[0].price, 1234.5);
    }
}
