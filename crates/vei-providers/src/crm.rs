use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::crm::{Activity, Company, Contact, Deal, DealStage};
use vei_types::{DomainError, Scheduler, ToolSpec};

use crate::McpError;

fn parse_stage(value: Option<&str>) -> DealStage {
    match value {
        Some("qualification") => DealStage::Qualification,
        Some("proposal") => DealStage::Proposal,
        Some("negotiation") => DealStage::Negotiation,
        Some("closed_won") => DealStage::ClosedWon,
        Some("closed_lost") => DealStage::ClosedLost,
        _ => DealStage::Prospecting,
    }
}

/// CRM with consent enforcement (section 4.6.5).
pub struct CrmProvider {
    contacts: HashMap<String, Contact>,
    companies: HashMap<String, Company>,
    deals: HashMap<String, Deal>,
    activities: Vec<Activity>,
    contact_seq: IdSequence,
    company_seq: IdSequence,
    deal_seq: IdSequence,
    activity_seq: IdSequence,
    error_rate: f64,
}

impl CrmProvider {
    pub fn new(error_rate: f64) -> Self {
        Self {
            contacts: HashMap::new(),
            companies: HashMap::new(),
            deals: HashMap::new(),
            activities: Vec::new(),
            contact_seq: IdSequence::new("C-"),
            company_seq: IdSequence::new("CO-"),
            deal_seq: IdSequence::new("D-"),
            activity_seq: IdSequence::new("A-"),
            error_rate,
        }
    }

    fn create_contact(&mut self, args: &Value) -> Value {
        let id = self.contact_seq.next_id();
        let contact = Contact {
            id: id.clone(),
            name: args.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            email: args.get("email").and_then(Value::as_str).unwrap_or_default().to_string(),
            company_id: args.get("company_id").and_then(Value::as_str).map(str::to_string),
            do_not_contact: args.get("do_not_contact").and_then(Value::as_bool).unwrap_or(false),
        };
        self.contacts.insert(id.clone(), contact);
        json!({ "id": id })
    }

    fn create_company(&mut self, args: &Value) -> Value {
        let id = self.company_seq.next_id();
        let company = Company {
            id: id.clone(),
            name: args.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            domain: args.get("domain").and_then(Value::as_str).unwrap_or_default().to_string(),
        };
        self.companies.insert(id.clone(), company);
        json!({ "id": id })
    }

    fn create_deal(&mut self, args: &Value) -> Result<Value, McpError> {
        let company_id = args.get("company_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("create_deal requires `company_id`"))?;
        if !self.companies.contains_key(company_id) {
            return Ok(DomainError::new("unknown_company", format!("no such company: {company_id}")).into_value());
        }
        let id = self.deal_seq.next_id();
        let amount = args.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
        let deal = Deal {
            id: id.clone(),
            name: args.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            company_id: company_id.to_string(),
            stage: parse_stage(args.get("stage").and_then(Value::as_str)),
            amount_cents: (amount * 100.0).round() as i64,
        };
        self.deals.insert(id.clone(), deal);
        Ok(json!({ "id": id }))
    }

    fn update_deal_stage(&mut self, args: &Value) -> Result<Value, McpError> {
        let id = args.get("id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("update_deal_stage requires `id`"))?;
        let Some(deal) = self.deals.get_mut(id) else {
            return Ok(DomainError::new("unknown_deal", format!("no such deal: {id}")).into_value());
        };
        deal.stage = parse_stage(args.get("stage").and_then(Value::as_str));
        Ok(json!({ "id": id, "stage": deal.stage }))
    }

    fn log_activity(&mut self, args: &Value, rng: &mut DeterministicRng) -> Result<Value, McpError> {
        let kind = args.get("kind").and_then(Value::as_str).unwrap_or("note").to_string();
        let contact_id = args
            .get("contact_id")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("log_activity requires `contact_id`"))?;
        let Some(contact) = self.contacts.get(contact_id) else {
            return Ok(DomainError::new("unknown_contact", format!("no such contact: {contact_id}")).into_value());
        };
        if kind == "email_outreach" && contact.do_not_contact && rng.next_float() < self.error_rate {
            return Ok(DomainError::new("consent_violation", "contact has opted out of outreach").into_value());
        }
        let id = self.activity_seq.next_id();
        self.activities.push(Activity {
            id: id.clone(),
            kind,
            contact_id: contact_id.to_string(),
            notes: args.get("notes").and_then(Value::as_str).unwrap_or_default().to_string(),
        });
        Ok(json!({ "id": id }))
    }
}

impl crate::ToolProvider for CrmProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("crm.create_contact", "Create a contact").permissions(["crm.write"]).returns("{id}"),
            ToolSpec::new("crm.create_company", "Create a company").permissions(["crm.write"]).returns("{id}"),
            ToolSpec::new("crm.create_deal", "Create a deal against a company").permissions(["crm.write"]).returns("{id} or {error}"),
            ToolSpec::new("crm.update_deal_stage", "Move a deal to a new stage").permissions(["crm.write"]).returns("{id, stage} or {error}"),
            ToolSpec::new("crm.log_activity", "Log an activity against a contact")
                .permissions(["crm.write"])
                .fault_probability(self.error_rate)
                .returns("{id} or {error}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("crm.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "crm.create_contact" => Ok(self.create_contact(args)),
            "crm.create_company" => Ok(self.create_company(args)),
            "crm.create_deal" => self.create_deal(args),
            "crm.update_deal_stage" => self.update_deal_stage(args),
            "crm.log_activity" => self.log_activity(args, rng),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "crm"
    }

    fn focus_summary(&self) -> Option<String> {
        Some(format!("CRM: {} contacts, {} deals", self.contacts.len(), self.deals.len()))
    }

    fn action_menu(&self) -> Vec<Value> {
        vec![
            json!({ "tool": "crm.create_contact", "args": ["name", "email"] }),
            json!({ "tool": "crm.create_company", "args": ["name"] }),
            json!({ "tool": "crm.create_deal", "args": ["company_id", "name"] }),
            json!({ "tool": "crm.update_deal_stage", "args": ["deal_id", "stage"] }),
        ]
    }
}
