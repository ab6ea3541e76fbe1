use serde::{Deserialize, Serialize};

/// A single chat message. `ts` is assigned as `str(len(messages)+1)` by the
/// owning channel after append (section 3, "Chat channel"); it is a string
/// because the wire format treats timestamps as opaque thread-ordering
/// tokens, not integers, even though they are numerically monotone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub ts: String,
    pub user: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

/// An ordered, append-only channel. `unread` tracks messages not yet
/// surfaced through `vei.observe`; providers increment it on delivery and
/// the observation builder is free to read (not reset) it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChannel {
    pub name: String,
    pub messages: Vec<ChatMessage>,
    pub unread: u64,
}

impl ChatChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
            unread: 0,
        }
    }

    /// Numeric view of `ts`, used by `fetch_thread`'s ordering invariant.
    pub fn ts_numeric(ts: &str) -> u64 {
        ts.parse().unwrap_or(0)
    }
}
