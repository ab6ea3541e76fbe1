use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeResponse {
    Accepted,
    Declined,
    NoResponse,
}

/// A calendar event. `responses` is keyed by attendee (section 4.6.6,
/// "Calendar accept/decline records responses keyed by attendee; rejects
/// unknown attendees").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub attendees: Vec<String>,
    pub responses: HashMap<String, AttendeeResponse>,
}
