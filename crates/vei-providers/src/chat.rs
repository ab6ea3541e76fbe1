use std::collections::HashMap;

use regex::Regex;
use serde_json::{Value, json};
use vei_core::DeterministicRng;
use vei_types::domain::chat::{ChatChannel, ChatMessage};
use vei_types::{Scheduler, ToolSpec};

use crate::McpError;

/// Slack-like chat (section 4.6.1).
pub struct ChatProvider {
    channels: HashMap<String, ChatChannel>,
    derail_probability: f64,
    budget_cap_usd: f64,
    amount_re: Regex,
}

const TRIGGER_WORDS: [&str; 3] = ["approve", "summary", "budget"];

impl ChatProvider {
    pub fn new(channel_names: &[String], derail_probability: f64, budget_cap_usd: f64) -> Self {
        let mut channels = HashMap::new();
        for name in channel_names {
            channels.insert(name.clone(), ChatChannel::new(name.clone()));
        }
        channels.entry("#procurement".to_string()).or_insert_with(|| ChatChannel::new("#procurement"));
        Self {
            channels,
            derail_probability,
            budget_cap_usd,
            amount_re: Regex::new(r"\d[\d,]*").expect("valid regex"),
        }
    }

    pub fn channel(&self, name: &str) -> Option<&ChatChannel> {
        self.channels.get(name)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChatChannel> {
        self.channels.values()
    }

    fn extract_amount(&self, text: &str) -> Option<f64> {
        let without_commas = text.replace(',', "");
        self.amount_re
            .find(&without_commas)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    fn send_message(
        &mut self,
        args: &Value,
        rng: &mut DeterministicRng,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        let channel_name = args
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("send_message requires `channel`"))?;
        let text = args
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("send_message requires `text`"))?
            .to_string();
        let thread_ts = args.get("thread_ts").and_then(Value::as_str).map(str::to_string);

        let channel = self
            .channels
            .get_mut(channel_name)
            .ok_or_else(|| McpError::unknown_channel(channel_name))?;

        let ts = (channel.messages.len() + 1).to_string();
        channel.messages.push(ChatMessage {
            ts: ts.clone(),
            user: "agent".to_string(),
            text: text.clone(),
            thread_ts: thread_ts.clone(),
        });
        channel.unread += 1;

        let thread_key = thread_ts.clone().unwrap_or_else(|| ts.clone());

        if rng.next_float() < self.derail_probability {
            let payload = derail_payload(channel_name, &thread_key);
            scheduler.schedule(7_000, "chat", payload);
        }

        let lower = text.to_lowercase();
        if TRIGGER_WORDS.iter().any(|w| lower.contains(w)) {
            match self.extract_amount(&text) {
                None => {
                    scheduler.schedule(
                        9_000,
                        "chat",
                        reply_payload(channel_name, &thread_key, "What is the budget amount?"),
                    );
                }
                Some(amount) if amount <= self.budget_cap_usd => {
                    scheduler.schedule(
                        12_000,
                        "chat",
                        reply_payload(channel_name, &thread_key, ":white_check_mark: Approved"),
                    );
                }
                Some(_) => {
                    scheduler.schedule(
                        10_000,
                        "chat",
                        reply_payload(
                            channel_name,
                            &thread_key,
                            "Need clearer budget justification (over cap).",
                        ),
                    );
                }
            }
        }

        Ok(json!({ "channel": channel_name, "ts": ts }))
    }

    fn fetch_thread(&self, args: &Value) -> Result<Value, McpError> {
        let channel_name = args
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("fetch_thread requires `channel`"))?;
        let thread_ts = args
            .get("thread_ts")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_args("fetch_thread requires `thread_ts`"))?;

        let channel = self
            .channels
            .get(channel_name)
            .ok_or_else(|| McpError::unknown_channel(channel_name))?;

        let root_numeric = ChatChannel::ts_numeric(thread_ts);
        let mut matches: Vec<&ChatMessage> = channel
            .messages
            .iter()
            .filter(|m| m.thread_ts.as_deref() == Some(thread_ts) || ChatChannel::ts_numeric(&m.ts) >= root_numeric)
            .collect();
        // Thread root plus replies, ordered by numeric ts (section 4.6.1.4
        // / section 8, "Chat ordering").
        matches.sort_by_key(|m| ChatChannel::ts_numeric(&m.ts));

        Ok(json!({ "messages": matches }))
    }
}

fn derail_payload(channel: &str, thread_ts: &str) -> vei_types::Payload {
    let mut payload = vei_types::Payload::new();
    payload.insert("channel".to_string(), json!(channel));
    payload.insert("thread_ts".to_string(), json!(thread_ts));
    payload.insert("text".to_string(), json!("(unrelated) did anyone see the build go red?"));
    payload
}

fn reply_payload(channel: &str, thread_ts: &str, text: &str) -> vei_types::Payload {
    let mut payload = vei_types::Payload::new();
    payload.insert("channel".to_string(), json!(channel));
    payload.insert("thread_ts".to_string(), json!(thread_ts));
    payload.insert("text".to_string(), json!(text));
    payload
}

impl crate::ToolProvider for ChatProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("slack.send_message", "Post a message to a channel, optionally in a thread")
                .permissions(["chat.write"])
                .side_effects(["schedules_reply"])
                .returns("{channel, ts}"),
            ToolSpec::new("slack.fetch_thread", "Fetch a thread's messages ordered by ts")
                .permissions(["chat.read"])
                .returns("{messages: [...]}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("slack.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        rng: &mut DeterministicRng,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "slack.send_message" => self.send_message(args, rng, scheduler),
            "slack.fetch_thread" => self.fetch_thread(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "chat"
    }

    fn focus_summary(&self) -> Option<String> {
        let last = self.channels.get("#procurement").and_then(|c| c.messages.last());
        Some(match last {
            Some(m) => format!("#procurement: {}", m.text),
            None => "#procurement: (no messages)".to_string(),
        })
    }

    fn action_menu(&self) -> Vec<Value> {
        vec![json!({ "tool": "slack.send_message", "args": ["channel", "text", "thread_ts?"] })]
    }

    fn deliver(&mut self, payload: &Value, _rng: &mut DeterministicRng, _scheduler: &mut dyn Scheduler) {
        let (Some(channel_name), Some(text)) = (
            payload.get("channel").and_then(Value::as_str),
            payload.get("text").and_then(Value::as_str),
        ) else {
            return;
        };
        let thread_ts = payload.get("thread_ts").and_then(Value::as_str).map(str::to_string);
        if let Some(channel) = self.channels.get_mut(channel_name) {
            let ts = (channel.messages.len() + 1).to_string();
            channel.messages.push(ChatMessage {
                ts,
                user: "vendor-bot".to_string(),
                text: text.to_string(),
                thread_ts,
            });
            channel.unread += 1;
        }
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

    fn provider() -> ChatProvider {
        ChatProvider::new(&["#procurement".to_string()], 0.0, 3000.0)
    }

    #[test]
    fn send_message_assigns_increasing_ts() {
        let mut p = provider();
        let mut rng = DeterministicRng::new(1);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        let r1 = p.call("slack.send_message", &json!({"channel": "#procurement", "text": "hi"}), &mut rng, &mut bus).unwrap();
        let r2 = p.call("slack.send_message", &json!({"channel": "#procurement", "text": "again"}), &mut rng, &mut bus).unwrap();
        assert_eq!(r1["ts"], "1");
        assert_eq!(r2["ts"], "2");
    }

    #[test]
    fn approval_within_cap_schedules_approved_reply() {
        let mut p = provider();
        let mut rng = DeterministicRng::new(123);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call(
            "slack.send_message",
            &json!({"channel": "#procurement", "text": "Please approve; budget $2500."}),
            &mut rng,
            &mut bus,
        )
        .unwrap();
        assert!(bus.scheduled.iter().any(|(_, target, payload)| {
            target == "chat" && payload.get("text").and_then(Value::as_str) == Some(":white_check_mark: Approved")
        }));
    }

    #[test]
    fn approval_over_cap_schedules_over_cap_reply() {
        let mut p = ChatProvider::new(&["#procurement".to_string()], 0.0, 1000.0);
        let mut rng = DeterministicRng::new(123);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call(
            "slack.send_message",
            &json!({"channel": "#procurement", "text": "Request approval, budget $2000"}),
            &mut rng,
            &mut bus,
        )
        .unwrap();
        assert!(bus.scheduled.iter().any(|(_, _, payload)| {
            payload.get("text").and_then(Value::as_str).unwrap_or_default().contains("over cap")
        }));
    }

    #[test]
    fn missing_amount_schedules_clarifying_question() {
        let mut p = provider();
        let mut rng = DeterministicRng::new(123);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call(
            "slack.send_message",
            &json!({"channel": "#procurement", "text": "Can you approve this?"}),
            &mut rng,
            &mut bus,
        )
        .unwrap();
        assert!(bus.scheduled.iter().any(|(_, _, payload)| {
            payload.get("text").and_then(Value::as_str) == Some("What is the budget amount?")
        }));
    }

    #[test]
    fn fetch_thread_orders_by_numeric_ts() {
        let mut p = provider();
        let mut rng = DeterministicRng::new(1);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        p.call("slack.send_message", &json!({"channel": "#procurement", "text": "root"}), &mut rng, &mut bus).unwrap();
        p.call(
            "slack.send_message",
            &json!({"channel": "#procurement", "text": "reply", "thread_ts": "1"}),
            &mut rng,
            &mut bus,
        )
        .unwrap();
        let thread = p.fetch_thread(&json!({"channel": "#procurement", "thread_ts": "1"})).unwrap();
        let messages = thread["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["ts"], "1");
        assert_eq!(messages[1]["ts"], "2");
    }

    #[test]
    fn unknown_channel_is_a_typed_error() {
        let mut p = provider();
        let mut rng = DeterministicRng::new(1);
        let mut bus = TestBus { clock: 0, scheduled: vec![] };
        let err = p.call("slack.send_message", &json!({"channel": "#nope", "text": "hi"}), &mut rng, &mut bus).unwrap_err();
        assert_eq!(err.code, "unknown_channel");
    }
}
