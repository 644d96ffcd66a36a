//! Conversation storage contract (ports).
//!
//! The [`ConversationStore`] trait is the single entry point the
//! orchestration layer talks to: history saves/reads, the chat directory,
//! and the assistant registry. Backends implement it in `parley-infra`.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

pub mod group;
pub mod page;

use parley_types::assistant::{Assistant, AssistantId, AssistantProfile};
use parley_types::chat::{ChatEntry, ChatInfo};
use parley_types::error::StorageError;
use parley_types::history::{HistoryEntry, NewMessage};
use serde::{Deserialize, Serialize};

pub use page::Pagination;

/// Page size applied when a filter leaves it unset or zero.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

/// Filter for chat directory listings.
///
/// Pages are 1-based; unset or zero values fall back to page 1 and
/// [`DEFAULT_PAGE_SIZE`]. Ordering is by `created_at`, newest first unless
/// overridden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatFilter {
    /// Substring match against chat titles.
    pub keywords: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub order: Option<SortOrder>,
}

impl ChatFilter {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn order(&self) -> SortOrder {
        self.order.unwrap_or_default()
    }
}

/// Filter for assistant registry listings.
///
/// `tags` uses OR semantics: a row matches when its stored tag set
/// intersects the requested set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantFilter {
    pub tags: Vec<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl AssistantFilter {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// A calendar-day bucket of chats ("Today", "Yesterday", or a date string).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatGroup {
    pub label: String,
    pub chats: Vec<ChatEntry>,
}

/// One page of the chat directory, bucketed by calendar day.
///
/// `total` and `last_page` are computed over the filtered row count before
/// bucketing, never over the unfiltered table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPage {
    pub groups: Vec<ChatGroup>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub last_page: u32,
}

/// One page of assistant registry listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantPage {
    pub items: Vec<Assistant>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub last_page: u32,
    /// `None` when already on the last page.
    pub next_page: Option<u32>,
    /// `None` when on the first page.
    pub previous_page: Option<u32>,
}

/// Storage interface for conversational state.
///
/// All operations are independent request/response calls; the store holds no
/// scheduler or background task. Session isolation is enforced by the `sid`
/// argument on every query. Absent entities come back as `None` or an empty
/// collection -- see `StorageError` for when `NotFound` applies.
pub trait ConversationStore: Send + Sync {
    /// Append a batch of messages to a chat's history.
    ///
    /// Creates the owning chat row (untitled) when it does not yet exist;
    /// the whole batch is written atomically. `context` is attached to every
    /// row of the batch as a snapshot of conversation-level metadata.
    fn save_history(
        &self,
        sid: &str,
        cid: &str,
        messages: &[NewMessage],
        context: Option<&serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Get a chat's non-expired history in conversation order
    /// (oldest first), bounded to the configured window of newest rows.
    fn get_history(
        &self,
        sid: &str,
        cid: &str,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryEntry>, StorageError>> + Send;

    /// Append one request/response exchange, tagged with `rid` for replay.
    fn save_request(
        &self,
        sid: &str,
        rid: &str,
        cid: &str,
        messages: &[NewMessage],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Get the messages of a single exchange, same ordering and expiry
    /// contract as `get_history`.
    fn get_request(
        &self,
        sid: &str,
        rid: &str,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryEntry>, StorageError>> + Send;

    /// List a session's chats, filtered and paginated, bucketed by
    /// calendar day.
    fn get_chats(
        &self,
        sid: &str,
        filter: ChatFilter,
    ) -> impl std::future::Future<Output = Result<ChatPage, StorageError>> + Send;

    /// Get one chat with its full history; `None` when the chat does not
    /// exist for that session.
    fn get_chat(
        &self,
        sid: &str,
        cid: &str,
    ) -> impl std::future::Future<Output = Result<Option<ChatInfo>, StorageError>> + Send;

    /// Update a chat's title. Succeeds as a no-op when the chat does not
    /// exist; never fabricates a row.
    fn update_chat_title(
        &self,
        sid: &str,
        cid: &str,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Delete a chat and all of its history rows.
    fn delete_chat(
        &self,
        sid: &str,
        cid: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Delete every chat and history row owned by a session.
    fn delete_all_chats(
        &self,
        sid: &str,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Register a new assistant, returning its generated id.
    fn create_assistant(
        &self,
        profile: &AssistantProfile,
    ) -> impl std::future::Future<Output = Result<AssistantId, StorageError>> + Send;

    /// Replace an existing assistant's profile.
    ///
    /// Returns `StorageError::NotFound` when the id is unknown.
    fn update_assistant(
        &self,
        id: &AssistantId,
        profile: &AssistantProfile,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Get one assistant by id; `None` when absent.
    fn get_assistant(
        &self,
        id: &AssistantId,
    ) -> impl std::future::Future<Output = Result<Option<Assistant>, StorageError>> + Send;

    /// Remove an assistant.
    ///
    /// Returns `StorageError::NotFound` when the id is unknown, matching
    /// `update_assistant`.
    fn delete_assistant(
        &self,
        id: &AssistantId,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// List assistants, filtered by tag intersection and paginated.
    fn get_assistants(
        &self,
        filter: AssistantFilter,
    ) -> impl std::future::Future<Output = Result<AssistantPage, StorageError>> + Send;

    /// Physically delete history rows past their expiry, returning the
    /// count removed. Reads never require this; expiry filtering happens at
    /// query time.
    fn prune_expired(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_filter_defaults() {
        let filter = ChatFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.order(), SortOrder::Desc);
    }

    #[test]
    fn test_chat_filter_zero_falls_back_to_defaults() {
        let filter = ChatFilter {
            page: Some(0),
            page_size: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_assistant_filter_explicit_values() {
        let filter = AssistantFilter {
            tags: vec!["tag1".to_string()],
            page: Some(3),
            page_size: Some(10),
        };
        assert_eq!(filter.page(), 3);
        assert_eq!(filter.page_size(), 10);
    }

    #[test]
    fn test_sort_order_serde() {
        let json = serde_json::to_string(&SortOrder::Asc).unwrap();
        assert_eq!(json, "\"asc\"");
        let parsed: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(parsed, SortOrder::Desc);
    }
}
