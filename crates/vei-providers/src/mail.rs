use serde_json::{Value, json};
use vei_core::DeterministicRng;
use vei_types::domain::mail::{MailMessage, Mailbox};
use vei_types::{Scheduler, ToolSpec, VendorSeed};

use crate::McpError;

const DEFAULT_TEMPLATES: [&str; 4] = [
    "Thanks for reaching out. Our quote for this order is ${price}, ETA {eta} days. — {vendor}",
    "Hi, following up with pricing: ${price} total, delivery in {eta} business days. Regards, {vendor}",
    "Quote attached (see below): ${price}, ETA {eta} days. Let us know if you'd like to proceed. — {vendor}",
    "Per your request: ${price}, ETA {eta} days. Happy to adjust the order. — {vendor}",
];

/// Mail with scheduled vendor replies (section 4.6.2).
pub struct MailProvider {
    mailbox: Mailbox,
    vendors: Vec<VendorSeed>,
}

impl MailProvider {
    pub fn new(vendors: Vec<VendorSeed>) -> Self {
        let vendors = if vendors.is_empty() {
            vec![VendorSeed {
                name: "Macrocompute".to_string(),
                price: 1999.0,
                eta_days: 5,
                templates: DEFAULT_TEMPLATES.iter().map(|s| s.to_string()).collect(),
            }]
        } else {
            vendors
        };
        Self { mailbox: Mailbox::default(), vendors }
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    fn compose(&mut self, args: &Value, rng: &mut DeterministicRng, scheduler: &mut dyn Scheduler) -> Result<Value, McpError> {
        let to = args
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("compose requires `to`"))?
            .to_string();
        let subject = args
            .get("subj")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let body = args
            .get("body_text")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let id = self.mailbox.next_id();
        self.mailbox.store(MailMessage {
            id: id.clone(),
            to: to.clone(),
            from: "agent@company.example".to_string(),
            subject: subject.clone(),
            body,
            in_reply_to: None,
        });

        let vendor = rng
            .choice(&self.vendors)
            .cloned()
            .unwrap_or_else(|| self.vendors[0].clone());
        let template = vendor
            .templates
            .get(rng.randint(0, vendor.templates.len() as i64 - 1) as usize)
            .cloned()
            .unwrap_or_default();
        let reply_body = vendor.render(&template);

        let mut payload = vei_types::Payload::new();
        payload.insert("kind".to_string(), json!("vendor_reply"));
        payload.insert("in_reply_to".to_string(), json!(id));
        payload.insert("to".to_string(), json!(to));
        payload.insert("from".to_string(), json!(vendor.name.clone() + " <sales@vendor.example>"));
        payload.insert("subject".to_string(), json!(format!("Re: {subject}")));
        payload.insert("body".to_string(), json!(reply_body));
        scheduler.schedule(15_000, "mail", payload);

        Ok(json!({ "id": id }))
    }

    fn list_inbox(&self, args: &Value) -> Value {
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(20) as usize;
        let ids: Vec<&String> = self.mailbox.inbox.iter().take(limit).collect();
        let messages: Vec<&MailMessage> = ids.iter().filter_map(|id| self.mailbox.messages.get(*id)).collect();
        json!({ "messages": messages })
    }

    fn read(&self, args: &Value) -> Result<Value, McpError> {
        let id = args
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("read requires `id`"))?;
        match self.mailbox.messages.get(id) {
            Some(msg) => Ok(json!(msg)),
            None => Err(McpError::unknown_message(id)),
        }
    }
}

impl crate::ToolProvider for MailProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("mail.compose", "Compose and send an outbound message; schedules exactly one vendor reply")
                .permissions(["mail.write"])
                .side_effects(["schedules_reply"])
                .latency(80, 40)
                .returns("{id}"),
            ToolSpec::new("mail.list_inbox", "List inbox messages, newest first").permissions(["mail.read"]).returns("{messages: [...]}"),
            ToolSpec::new("mail.read", "Read a message by id").permissions(["mail.read"]).returns("message or {error}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("mail.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        rng: &mut DeterministicRng,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "mail.compose" => self.compose(args, rng, scheduler),
            "mail.list_inbox" => Ok(self.list_inbox(args)),
            "mail.read" => self.read(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "mail"
    }

    fn focus_summary(&self) -> Option<String> {
        Some(match self.mailbox.inbox.first().and_then(|id| self.mailbox.messages.get(id)) {
            Some(m) => format!("INBOX: {} — {}", m.subject, m.from),
            None => "INBOX empty".to_string(),
        })
    }

    fn action_menu(&self) -> Vec<Value> {
        vec![json!({ "tool": "mail.compose", "args": ["to", "subj", "body_text"] })]
    }

    fn deliver(&mut self, payload: &Value, _rng: &mut DeterministicRng, _scheduler: &mut dyn Scheduler) {
        let get = |k: &str| payload.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
        let id = format!("{}-r", get("in_reply_to"));
        self.mailbox.deliver(MailMessage {
            id,
            to: get("to"),
            from: get("from"),
            subject: get("subject"),
            body: get("body"),
            in_reply_to: Some(get("in_reply_to")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolProvider;

    struct TestBus {
        clock: u64,
        scheduled: Vec<(u64, String, vei_types::Payload)>,
    }

    impl Scheduler for TestBus {
        fn schedule(&mut self, dt_ms: u64, target: &str, payload: vei_types::Payload) {
            self.scheduled.push((self.clock + dt_ms, target.to_string(), payload));
        }
        fn clock_ms(&self) -> u64 {
            self.clock
        }
    }

    #[test]
    fn compose_schedules_exactly_one_reply_15s_out() {
        let mut p = MailProvider::new(vec![]);
        let mut rng = DeterministicRng::new(42042);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call(
            "mail.compose",
            &json!({"to": "sales@macrocompute.example", "subj": "Quote", "body_text": "please advise"}),
            &mut rng,
            &mut bus,
        )
        .unwrap();
        assert_eq!(bus.scheduled.len(), 1);
        assert_eq!(bus.scheduled[0].0, 15_000);
        assert_eq!(bus.scheduled[0].1, "mail");
    }

    #[test]
    fn delivered_reply_lands_in_inbox_newest_first() {
        let mut p = MailProvider::new(vec![]);
        let mut rng = DeterministicRng::new(1);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call("mail.compose", &json!({"to": "a@b.example", "subj": "s", "body_text": "b"}), &mut rng, &mut bus).unwrap();
        let (_, _, payload) = bus.scheduled.remove(0);
        p.deliver(&Value::Object(payload), &mut rng, &mut bus);
        assert_eq!(p.mailbox().inbox.len(), 1);
    }

    #[test]
    fn reply_body_contains_price_and_eta_pattern() {
        let mut p = MailProvider::new(vec![]);
        let mut rng = DeterministicRng::new(42042);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call("mail.compose", &json!({"to": "a@b.example", "subj": "s", "body_text": "b"}), &mut rng, &mut bus).unwrap();
        let body = bus.scheduled[0].2.get("body").unwrap().as_str().unwrap();
        assert!(body.contains('$'));
        assert!(body.to_lowercase().contains("eta") || body.to_lowercase().contains("day"));
    }
}
