use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::calendar::{AttendeeResponse, CalendarEvent};
use vei_types::{DomainError, Scheduler, ToolSpec};

use crate::McpError;

/// Calendar (section 4.6.6): attendee responses keyed by attendee.
pub struct CalendarProvider {
    events: HashMap<String, CalendarEvent>,
    seq: IdSequence,
}

impl CalendarProvider {
    pub fn new(seeded: Vec<CalendarEvent>) -> Self {
        let events = seeded.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self { events, seq: IdSequence::new("EVT-") }
    }

    fn create(&mut self, args: &Value) -> Result<Value, McpError> {
        let attendees: Vec<String> = args
            .get("attendees")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let id = self.seq.next_id();
        self.events.insert(
            id.clone(),
            CalendarEvent {
                id: id.clone(),
                title: args.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                start_ms: args.get("start_ms").and_then(Value::as_u64).unwrap_or(0),
                duration_ms: args.get("duration_ms").and_then(Value::as_u64).unwrap_or(1_800_000),
                attendees,
                responses: HashMap::new(),
            },
        );
        Ok(json!({ "id": id }))
    }

    fn get(&self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("get requires `id`"))?;
        match self.events.get(id) {
            Some(e) => Ok(json!(e)),
            None => Ok(DomainError::new("unknown_event", format!("no such calendar event: {id}")).into_value()),
        }
    }

    fn respond(&mut self, args: &Value, response: AttendeeResponse) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("respond requires `id`"))?;
        let attendee = args.get("attendee").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("respond requires `attendee`"))?;
        let Some(event) = self.events.get_mut(id) else {
            return Ok(DomainError::new("unknown_event", format!("no such calendar event: {id}")).into_value());
        };
        if !event.attendees.iter().any(|a| a == attendee) {
            return Ok(DomainError::new("unknown_attendee", format!("{attendee} is not invited to {id}")).into_value());
        }
        event.responses.insert(attendee.to_string(), response);
        Ok(json!({ "id": id, "attendee": attendee, "response": response }))
    }
}

impl crate::ToolProvider for CalendarProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("calendar.create", "Create a calendar event").permissions(["calendar.write"]).returns("{id}"),
            ToolSpec::new("calendar.get", "Fetch a calendar event by id").permissions(["calendar.read"]).returns("event or {error}"),
            ToolSpec::new("calendar.accept", "Record an attendee's acceptance").permissions(["calendar.write"]).returns("{id, attendee, response} or {error}"),
            ToolSpec::new("calendar.decline", "Record an attendee's decline").permissions(["calendar.write"]).returns("{id, attendee, response} or {error}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("calendar.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        _rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "calendar.create" => self.create(args),
            "calendar.get" => self.get(args),
            "calendar.accept" => self.respond(args, AttendeeResponse::Accepted),
            "calendar.decline" => self.respond(args, AttendeeResponse::Declined),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "calendar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolProvider;

    struct NoopBus;
    impl Scheduler for NoopBus {
        fn schedule(&mut self, _dt_ms: u64, _target: &str, _payload: vei_types::Payload) {}
        fn clock_ms(&self) -> u64 {
            0
        }
    }

    #[test]
    fn accept_records_response_keyed_by_attendee() {
        let mut p = CalendarProvider::new(vec![]);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let e = p.call("calendar.create", &json!({"title": "Sync", "attendees": ["alice"]}), &mut rng, &mut bus).unwrap();
        let id = e["id"].as_str().unwrap().to_string();
        p.call("calendar.accept", &json!({"id": id, "attendee": "alice"}), &mut rng, &mut bus).unwrap();
        assert_eq!(p.events[&id].responses["alice"], AttendeeResponse::Accepted);
    }

    #[test]
    fn unknown_attendee_is_rejected() {
        let mut p = CalendarProvider::new(vec![]);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let e = p.call("calendar.create", &json!({"title": "Sync", "attendees": ["alice"]}), &mut rng, &mut bus).unwrap();
        let id = e["id"].as_str().unwrap().to_string();
        let result = p.call("calendar.accept", &json!({"id": id, "attendee": "mallory"}), &mut rng, &mut bus).unwrap();
        assert_eq!(result["error"]["code"], "unknown_attendee");
    }
}
