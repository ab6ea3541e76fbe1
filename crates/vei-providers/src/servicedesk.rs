use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::servicedesk::{Incident, IncidentStatus, Request, RequestStatus};
use vei_types::{Scheduler, ServiceDeskSeed, ToolSpec};

use crate::McpError;

fn parse_incident_status(value: Option<&str>) -> Option<IncidentStatus> {
    match value {
        Some("new") => Some(IncidentStatus::New),
        Some("in_progress") => Some(IncidentStatus::InProgress),
        Some("resolved") => Some(IncidentStatus::Resolved),
        _ => None,
    }
}

fn parse_request_status(value: Option<&str>) -> Option<RequestStatus> {
    match value {
        Some("submitted") => Some(RequestStatus::Submitted),
        Some("approved") => Some(RequestStatus::Approved),
        Some("fulfilled") => Some(RequestStatus::Fulfilled),
        Some("rejected") => Some(RequestStatus::Rejected),
        _ => None,
    }
}

/// Service desk (section 4.6.6): incidents and requests with typed not-found errors.
pub struct ServiceDeskProvider {
    incidents: HashMap<String, Incident>,
    requests: HashMap<String, Request>,
    incident_seq: IdSequence,
    request_seq: IdSequence,
}

impl ServiceDeskProvider {
    pub fn new(seed: ServiceDeskSeed) -> Self {
        let incidents = seed.incidents.into_iter().map(|i| (i.id.clone(), i)).collect();
        let requests = seed.requests.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self { incidents, requests, incident_seq: IdSequence::new("INC-"), request_seq: IdSequence::new("REQ-") }
    }

    fn create_incident(&mut self, args: &Value) -> Value {
        let id = self.incident_seq.next_id();
        self.incidents.insert(
            id.clone(),
            Incident {
                id: id.clone(),
                summary: args.get("summary").and_then(Value::as_str).unwrap_or_default().to_string(),
                status: IncidentStatus::New,
                history: vec![json!({"status": IncidentStatus::New})],
            },
        );
        json!({ "id": id })
    }

    fn transition_incident(&mut self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("transition_incident requires `id`"))?;
        let status = parse_incident_status(args.get("status").and_then(Value::as_str)).ok_or_else(|| McpError::invalid_args("transition_incident requires a valid `status`"))?;
        let Some(incident) = self.incidents.get_mut(id) else {
            return Err(McpError::servicedesk_incident_not_found(id));
        };
        incident.status = status;
        incident.history.push(json!({"status": status}));
        Ok(json!({ "id": id, "status": status }))
    }

    fn create_request(&mut self, args: &Value) -> Value {
        let id = self.request_seq.next_id();
        self.requests.insert(
            id.clone(),
            Request {
                id: id.clone(),
                summary: args.get("summary").and_then(Value::as_str).unwrap_or_default().to_string(),
                status: RequestStatus::Submitted,
                history: vec![json!({"status": RequestStatus::Submitted})],
            },
        );
        json!({ "id": id })
    }

    fn transition_request(&mut self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("transition_request requires `id`"))?;
        let status = parse_request_status(args.get("status").and_then(Value::as_str)).ok_or_else(|| McpError::invalid_args("transition_request requires a valid `status`"))?;
        let Some(request) = self.requests.get_mut(id) else {
            return Err(McpError::servicedesk_request_not_found(id));
        };
        request.status = status;
        request.history.push(json!({"status": status}));
        Ok(json!({ "id": id, "status": status }))
    }
}

impl crate::ToolProvider for ServiceDeskProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("servicedesk.create_incident", "Open an incident").permissions(["servicedesk.write"]).returns("{id}"),
            ToolSpec::new("servicedesk.transition_incident", "Move an incident to a new status").permissions(["servicedesk.write"]).returns("{id, status}"),
            ToolSpec::new("servicedesk.create_request", "Submit a request").permissions(["servicedesk.write"]).returns("{id}"),
            ToolSpec::new("servicedesk.transition_request", "Move a request to a new status").permissions(["servicedesk.write"]).returns("{id, status}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("servicedesk.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        _rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "servicedesk.create_incident" => Ok(self.create_incident(args)),
            "servicedesk.transition_incident" => self.transition_incident(args),
            "servicedesk.create_request" => Ok(self.create_request(args)),
            "servicedesk.transition_request" => self.transition_request(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "servicedesk"
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
    fn incident_transition_appends_history() {
        let mut p = ServiceDeskProvider::new(ServiceDeskSeed::default());
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let i = p.create_incident(&json!({"summary": "db down"}));
        let id = i["id"].as_str().unwrap().to_string();
        p.call("servicedesk.transition_incident", &json!({"id": id, "status": "resolved"}), &mut rng, &mut bus).unwrap();
        assert_eq!(p.incidents[&id].history.len(), 2);
    }

    #[test]
    fn unknown_incident_is_a_typed_error() {
        let mut p = ServiceDeskProvider::new(ServiceDeskSeed::default());
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let err = p.call("servicedesk.transition_incident", &json!({"id": "INC-999", "status": "resolved"}), &mut rng, &mut bus).unwrap_err();
        assert_eq!(err.code, "servicedesk.incident_not_found");
    }
}
