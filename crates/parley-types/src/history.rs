//! History record types for Parley.
//!
//! A history entry is one message turn within a chat, partitioned by the
//! owning session (`sid`). Entries are append-only: once written they are
//! never mutated, only soft-expired via `expired_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Role of a message author within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "tool" => Ok(MessageRole::Tool),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A message to be appended to a chat's history.
///
/// Input type for history saves. Row-level metadata (`created_at`,
/// `expired_at`, the request tag) is stamped by the store at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    /// Display name of the author (e.g., the assistant's profile name).
    pub name: Option<String>,
    /// End-user identifier, when the platform tracks one per message.
    pub uid: Option<String>,
    pub content: String,
}

impl NewMessage {
    /// Convenience constructor for the common role + content case.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            uid: None,
            content: content.into(),
        }
    }
}

/// One persisted message turn.
///
/// `context` carries a snapshot of conversation-level metadata taken at save
/// time (token usage, model parameters); it is attached uniformly to every
/// row of a batch. `rid` tags the request/response exchange the row belongs
/// to, for replay of a single exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub sid: String,
    pub cid: String,
    pub rid: Option<String>,
    pub uid: Option<String>,
    pub role: MessageRole,
    pub name: Option<String>,
    pub content: String,
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Rows past this timestamp are logically absent from reads.
    pub expired_at: Option<DateTime<Utc>>,
}
