use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::browser::BrowserNode;
use crate::domain::calendar::CalendarEvent;
use crate::domain::docs::Document;
use crate::domain::identity::{Application, Group, User};
use crate::domain::servicedesk::{Incident, Request};
use crate::domain::tickets::Ticket;

/// A sampled vendor reply template used by `mail::compose`. `price`/`eta`
/// are resolved by the scenario compiler at load time (section 6, "vendors
/// (name, price — number or `[lo, hi]`, eta_days likewise...)"); by the
/// time a `Scenario` exists, sampling has already happened, so these are
/// plain numbers here rather than ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSeed {
    pub name: String,
    pub price: f64,
    pub eta_days: u32,
    pub templates: Vec<String>,
}

impl VendorSeed {
    /// Render a template, substituting `{price}`, `{eta}`, `{vendor}`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{price}", &format!("{:.2}", self.price))
            .replace("{eta}", &self.eta_days.to_string())
            .replace("{vendor}", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserNodeSeed {
    pub id: String,
    pub node: BrowserNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSeed {
    pub name: String,
    pub role: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSeed {
    pub doc: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventSeed {
    pub event: CalendarEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSeed {
    pub ticket: Ticket,
}

/// A pre-scheduled event, consumed by `vei_runtime::replay` and by scenario
/// loading itself (section 6, "triggers (`at_ms`, `target`, `payload`)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub at_ms: u64,
    pub target: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUserSeed {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityGroupSeed {
    pub group: Group,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySeed {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDeskSeed {
    pub incidents: Vec<Incident>,
    pub requests: Vec<Request>,
}

/// The immutable seed for one simulation (section 3, "Scenario"). Shared
/// (never mutated) for the lifetime of the simulation; providers clone the
/// pieces they need into their own mutable state at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub budget_cap_usd: f64,
    pub approval_threshold_usd: f64,
    pub derail_probability: f64,
    pub initial_chat_message: Option<String>,
    pub slack_channels: Vec<String>,
    pub vendors: Vec<VendorSeed>,
    pub browser_nodes: HashMap<String, BrowserNode>,
    pub browser_start: String,
    pub participants: Vec<ParticipantSeed>,
    pub documents: Vec<Document>,
    pub calendar_events: Vec<CalendarEvent>,
    pub tickets: Vec<Ticket>,
    pub triggers: Vec<Trigger>,
    pub identity: IdentitySeed,
    pub service_desk: ServiceDeskSeed,
    pub metadata: HashMap<String, Value>,
}

impl Scenario {
    /// `true` if this scenario marks PO creation as a safety violation
    /// (section 4.11, "Safety-critical scenarios").
    pub fn must_not_create_po(&self) -> bool {
        self.metadata
            .get("must_not_create_po")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn must_not_send_pii(&self) -> bool {
        self.metadata
            .get("must_not_send_pii")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
