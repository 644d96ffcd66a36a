//! SQLite conversation store facade.
//!
//! Implements `ConversationStore` from `parley-core` by composing the
//! history store, chat directory, and assistant registry over one shared
//! pool. The facade stays thin: cross-entity behavior (implicit chat
//! creation on history saves, chat + history composition on reads) lives
//! here, everything single-table lives in the stores.

use chrono::Utc;
use parley_core::store::group::group_by_day;
use parley_core::store::{
    AssistantFilter, AssistantPage, ChatFilter, ChatPage, ConversationStore, Pagination,
};
use parley_types::assistant::{Assistant, AssistantId, AssistantProfile};
use parley_types::chat::ChatInfo;
use parley_types::config::StoreSettings;
use parley_types::error::StorageError;
use parley_types::history::{HistoryEntry, NewMessage};

use super::assistant::SqliteAssistantRegistry;
use super::chat::SqliteChatDirectory;
use super::history::SqliteHistoryStore;
use super::pool::DatabasePool;
use super::schema;

/// SQLite-backed implementation of `ConversationStore`.
#[derive(Debug)]
pub struct SqliteConversationStore {
    history: SqliteHistoryStore,
    chats: SqliteChatDirectory,
    assistants: SqliteAssistantRegistry,
    settings: StoreSettings,
}

impl SqliteConversationStore {
    /// Connect to the database and provision the schema.
    ///
    /// Schema failure here is fatal: a store that cannot guarantee its
    /// tables must not be handed to callers.
    pub async fn connect(
        database_url: &str,
        settings: StoreSettings,
    ) -> Result<Self, StorageError> {
        let pool = DatabasePool::new(database_url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::with_pool(pool, settings).await
    }

    /// Build a store over an existing pool (e.g. one shared with other
    /// subsystems), provisioning the schema first.
    pub async fn with_pool(
        pool: DatabasePool,
        settings: StoreSettings,
    ) -> Result<Self, StorageError> {
        schema::ensure_schema(&pool, &settings).await?;
        tracing::info!(
            prefix = %settings.table_prefix,
            ttl_seconds = settings.ttl_seconds,
            "conversation store ready"
        );

        Ok(Self {
            history: SqliteHistoryStore::new(pool.clone(), settings.clone()),
            chats: SqliteChatDirectory::new(pool.clone(), settings.clone()),
            assistants: SqliteAssistantRegistry::new(pool, settings.clone()),
            settings,
        })
    }
}

impl ConversationStore for SqliteConversationStore {
    async fn save_history(
        &self,
        sid: &str,
        cid: &str,
        messages: &[NewMessage],
        context: Option<&serde_json::Value>,
    ) -> Result<(), StorageError> {
        // History save is also implicit chat creation.
        self.chats.ensure(sid, cid).await?;
        self.history.append(sid, cid, None, messages, context).await
    }

    async fn get_history(&self, sid: &str, cid: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        self.history.get(sid, cid).await
    }

    async fn save_request(
        &self,
        sid: &str,
        rid: &str,
        cid: &str,
        messages: &[NewMessage],
    ) -> Result<(), StorageError> {
        self.chats.ensure(sid, cid).await?;
        self.history.append(sid, cid, Some(rid), messages, None).await
    }

    async fn get_request(&self, sid: &str, rid: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        self.history.get_by_request(sid, rid).await
    }

    async fn get_chats(&self, sid: &str, filter: ChatFilter) -> Result<ChatPage, StorageError> {
        let page = filter.page();
        let page_size = filter.page_size();
        let (chats, total) = self.chats.list(sid, &filter).await?;
        let pagination = Pagination::compute(total, page, page_size);
        let groups = group_by_day(chats, self.settings.day_boundary, Utc::now());

        Ok(ChatPage {
            groups,
            page,
            page_size,
            total,
            last_page: pagination.last_page,
        })
    }

    async fn get_chat(&self, sid: &str, cid: &str) -> Result<Option<ChatInfo>, StorageError> {
        let Some(chat) = self.chats.get(sid, cid).await? else {
            return Ok(None);
        };
        let history = self.history.get(sid, cid).await?;

        Ok(Some(ChatInfo { chat, history }))
    }

    async fn update_chat_title(
        &self,
        sid: &str,
        cid: &str,
        title: &str,
    ) -> Result<(), StorageError> {
        self.chats.update_title(sid, cid, title).await
    }

    async fn delete_chat(&self, sid: &str, cid: &str) -> Result<(), StorageError> {
        self.chats.delete(sid, cid).await
    }

    async fn delete_all_chats(&self, sid: &str) -> Result<(), StorageError> {
        self.chats.delete_all(sid).await
    }

    async fn create_assistant(
        &self,
        profile: &AssistantProfile,
    ) -> Result<AssistantId, StorageError> {
        self.assistants.create(profile).await
    }

    async fn update_assistant(
        &self,
        id: &AssistantId,
        profile: &AssistantProfile,
    ) -> Result<(), StorageError> {
        self.assistants.update(id, profile).await
    }

    async fn get_assistant(&self, id: &AssistantId) -> Result<Option<Assistant>, StorageError> {
        self.assistants.get(id).await
    }

    async fn delete_assistant(&self, id: &AssistantId) -> Result<(), StorageError> {
        self.assistants.delete(id).await
    }

    async fn get_assistants(
        &self,
        filter: AssistantFilter,
    ) -> Result<AssistantPage, StorageError> {
        let page = filter.page();
        let page_size = filter.page_size();
        let (items, total) = self.assistants.list(&filter).await?;
        let pagination = Pagination::compute(total, page, page_size);

        Ok(AssistantPage {
            items,
            page,
            page_size,
            total,
            last_page: pagination.last_page,
            next_page: pagination.next_page,
            previous_page: pagination.previous_page,
        })
    }

    async fn prune_expired(&self) -> Result<u64, StorageError> {
        self.history.prune_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::history::MessageRole;

    async fn test_store() -> SqliteConversationStore {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        SqliteConversationStore::connect(&url, StoreSettings::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_provisions_schema() {
        // Connecting twice against the same settings must not fail.
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);

        let _first = SqliteConversationStore::connect(&url, StoreSettings::default())
            .await
            .unwrap();
        let _second = SqliteConversationStore::connect(&url, StoreSettings::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);

        let settings = StoreSettings {
            table_prefix: "no spaces".to_string(),
            ..Default::default()
        };
        let err = SqliteConversationStore::connect(&url, settings)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_save_history_implicitly_creates_chat() {
        let store = test_store().await;

        store
            .save_history(
                "s1",
                "c1",
                &[NewMessage::new(MessageRole::User, "hello")],
                None,
            )
            .await
            .unwrap();

        let info = store.get_chat("s1", "c1").await.unwrap().unwrap();
        assert_eq!(info.chat.chat_id, "c1");
        assert!(info.chat.title.is_none());
        assert_eq!(info.history.len(), 1);
    }

    #[tokio::test]
    async fn test_save_request_tags_rows() {
        let store = test_store().await;

        store
            .save_request(
                "s1",
                "r1",
                "c1",
                &[
                    NewMessage::new(MessageRole::User, "question"),
                    NewMessage::new(MessageRole::Assistant, "answer"),
                ],
            )
            .await
            .unwrap();

        let exchange = store.get_request("s1", "r1").await.unwrap();
        assert_eq!(exchange.len(), 2);
        // The exchange also landed in the chat's history.
        assert_eq!(store.get_history("s1", "c1").await.unwrap().len(), 2);
    }
}
