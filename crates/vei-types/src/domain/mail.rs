use serde::{Deserialize, Serialize};

/// A mail message, either outbound (composed by the agent) or inbound (a
/// scheduled vendor reply). `id` is `m<counter>` for outbound mail and
/// `m<counter>-r` for the reply the compose schedules (section 4.6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub in_reply_to: Option<String>,
}

/// The mailbox (section 3, "Mailbox"). `inbox` holds ids newest-first;
/// `counter` assigns the next outbound id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mailbox {
    pub messages: std::collections::HashMap<String, MailMessage>,
    pub inbox: Vec<String>,
    pub counter: u64,
}

impl Mailbox {
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("m{}", self.counter)
    }

    /// Newest-first insert, preserving the "inbox ids are unique" invariant.
    pub fn deliver(&mut self, message: MailMessage) {
        let id = message.id.clone();
        self.messages.insert(id.clone(), message);
        self.inbox.retain(|existing| existing != &id);
        self.inbox.insert(0, id);
    }

    /// Records an outbound message without touching `inbox`; only inbound
    /// arrivals (`deliver`) land there.
    pub fn store(&mut self, message: MailMessage) {
        self.messages.insert(message.id.clone(), message);
    }
}
