//! Chat record types for Parley.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;

/// One row in the chat directory -- a single conversation.
///
/// `chat_id` is caller-supplied and unique per session (`sid`). A chat may
/// exist with zero history rows (created directly) or be implicitly created
/// by the first history save for a new chat id, in which case `title` is
/// `None` until set later (e.g., auto-generated from the opening exchange).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: i64,
    pub chat_id: String,
    pub title: Option<String>,
    pub sid: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Chat metadata together with its full (non-expired) history.
///
/// Returned by single-chat lookups. Callers distinguish "no such chat"
/// (`None` from the lookup) from "empty chat" (`history` is empty).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInfo {
    pub chat: ChatEntry,
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_entry_serialize() {
        let entry = ChatEntry {
            id: 7,
            chat_id: "c1".to_string(),
            title: None,
            sid: "s1".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"chat_id\":\"c1\""));
        assert!(json.contains("\"title\":null"));
    }

    #[test]
    fn test_chat_info_empty_history() {
        let info = ChatInfo {
            chat: ChatEntry {
                id: 1,
                chat_id: "c1".to_string(),
                title: Some("First chat".to_string()),
                sid: "s1".to_string(),
                created_at: Utc::now(),
                updated_at: None,
            },
            history: Vec::new(),
        };
        assert!(info.history.is_empty());
        assert_eq!(info.chat.title.as_deref(), Some("First chat"));
    }
}
