use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::tickets::{Ticket, TicketStatus};
use vei_types::{DomainError, Scheduler, ToolSpec};

use crate::McpError;

fn parse_status(value: Option<&str>) -> Option<TicketStatus> {
    match value {
        Some("open") => Some(TicketStatus::Open),
        Some("in_progress") => Some(TicketStatus::InProgress),
        Some("resolved") => Some(TicketStatus::Resolved),
        Some("closed") => Some(TicketStatus::Closed),
        _ => None,
    }
}

/// Tickets (section 4.6.6): CRUD with an append-only history.
pub struct TicketsProvider {
    tickets: HashMap<String, Ticket>,
    seq: IdSequence,
}

impl TicketsProvider {
    pub fn new(seeded: Vec<Ticket>) -> Self {
        let tickets = seeded.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self { tickets, seq: IdSequence::new("TCK-") }
    }

    fn create(&mut self, args: &Value) -> Value {
        let id = self.seq.next_id();
        self.tickets.insert(
            id.clone(),
            Ticket {
                id: id.clone(),
                subject: args.get("subject").and_then(Value::as_str).unwrap_or_default().to_string(),
                status: TicketStatus::Open,
                assignee: args.get("assignee").and_then(Value::as_str).map(str::to_string),
                history: vec![json!({"status": TicketStatus::Open})],
            },
        );
        json!({ "id": id })
    }

    fn get(&self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("get requires `id`"))?;
        match self.tickets.get(id) {
            Some(t) => Ok(json!(t)),
            None => Ok(DomainError::new("unknown_ticket", format!("no such ticket: {id}")).into_value()),
        }
    }

    fn transition(&mut self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("transition requires `id`"))?;
        let status = parse_status(args.get("status").and_then(Value::as_str)).ok_or_else(|| McpError::invalid_args("transition requires a valid `status`"))?;
        let Some(ticket) = self.tickets.get_mut(id) else {
            return Ok(DomainError::new("unknown_ticket", format!("no such ticket: {id}")).into_value());
        };
        ticket.status = status;
        ticket.history.push(json!({ "status": status }));
        Ok(json!({ "id": id, "status": status }))
    }

    fn update(&mut self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("update requires `id`"))?;
        let Some(ticket) = self.tickets.get_mut(id) else {
            return Ok(DomainError::new("unknown_ticket", format!("no such ticket: {id}")).into_value());
        };
        if let Some(subject) = args.get("subject").and_then(Value::as_str) {
            ticket.subject = subject.to_string();
        }
        if let Some(assignee) = args.get("assignee").and_then(Value::as_str) {
            ticket.assignee = Some(assignee.to_string());
        }
        ticket.history.push(json!({ "status": ticket.status, "update": "fields" }));
        Ok(json!({ "id": id }))
    }
}

impl crate::ToolProvider for TicketsProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("tickets.create", "Create a ticket").permissions(["tickets.write"]).returns("{id}"),
            ToolSpec::new("tickets.get", "Fetch a ticket by id").permissions(["tickets.read"]).returns("ticket or {error}"),
            ToolSpec::new("tickets.transition", "Move a ticket to a new status").permissions(["tickets.write"]).returns("{id, status} or {error}"),
            ToolSpec::new("tickets.update", "Update ticket fields").permissions(["tickets.write"]).returns("{id} or {error}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("tickets.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        _rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "tickets.create" => Ok(self.create(args)),
            "tickets.get" => self.get(args),
            "tickets.transition" => self.transition(args),
            "tickets.update" => self.update(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "tickets"
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
    fn transition_appends_status_to_history() {
        let mut p = TicketsProvider::new(vec![]);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let t = p.create(&json!({"subject": "printer jam"}));
        let id = t["id"].as_str().unwrap().to_string();
        p.call("tickets.transition", &json!({"id": id, "status": "in_progress"}), &mut rng, &mut bus).unwrap();
        let ticket = &p.tickets[&id];
        assert_eq!(ticket.history.len(), 2);
        assert_eq!(ticket.history[1]["status"], "in_progress");
    }

    #[test]
    fn update_appends_status_and_update_marker() {
        let mut p = TicketsProvider::new(vec![]);
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let t = p.create(&json!({"subject": "printer jam"}));
        let id = t["id"].as_str().unwrap().to_string();
        p.call("tickets.update", &json!({"id": id, "assignee": "ops"}), &mut rng, &mut bus).unwrap();
        let ticket = &p.tickets[&id];
        assert_eq!(ticket.history[1]["update"], "fields");
    }
}
