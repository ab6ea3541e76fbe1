use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

/// A support ticket with an append-only history array, mutated only by
/// `vei_providers::tickets` (section 4.6.6: "Ticket transition appends
/// `{status}` to history; update appends `{status, update:\"fields\"}`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub status: TicketStatus,
    pub assignee: Option<String>,
    pub history: Vec<serde_json::Value>,
}
