//! SQLite chat directory.
//!
//! One row per conversation, unique on `(sid, chat_id)`. The directory owns
//! both deletion paths: removing a chat removes its history rows first, then
//! the chat row, inside one writer transaction, so a partial failure can only
//! leave orphaned history (harmless, re-runnable), never a chat row whose
//! history is already gone.

use chrono::{DateTime, Utc};
use parley_core::store::{ChatFilter, SortOrder};
use parley_types::chat::ChatEntry;
use parley_types::config::StoreSettings;
use parley_types::error::StorageError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed chat directory.
#[derive(Debug)]
pub struct SqliteChatDirectory {
    pool: DatabasePool,
    settings: StoreSettings,
}

impl SqliteChatDirectory {
    /// Create a new chat directory backed by the given database pool.
    pub fn new(pool: DatabasePool, settings: StoreSettings) -> Self {
        Self { pool, settings }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRow {
    id: i64,
    chat_id: String,
    title: Option<String>,
    sid: String,
    created_at: String,
    updated_at: Option<String>,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            title: row.try_get("title")?,
            sid: row.try_get("sid")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_entry(self) -> Result<ChatEntry, StorageError> {
        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = self.updated_at.as_deref().map(parse_datetime).transpose()?;

        Ok(ChatEntry {
            id: self.id,
            chat_id: self.chat_id,
            title: self.title,
            sid: self.sid,
            created_at,
            updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl SqliteChatDirectory {
    /// Create the chat row for `(sid, cid)` if it does not exist yet.
    ///
    /// Untitled on creation; history saves call this so the first message of
    /// a new chat implicitly registers it in the directory.
    pub async fn ensure(&self, sid: &str, cid: &str) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT INTO {} (chat_id, title, sid, created_at)
             VALUES (?, NULL, ?, ?)
             ON CONFLICT (sid, chat_id) DO NOTHING",
            self.settings.chat_table()
        );

        sqlx::query(&sql)
            .bind(cid)
            .bind(sid)
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    /// Get one chat row; `None` when absent for that session.
    pub async fn get(&self, sid: &str, cid: &str) -> Result<Option<ChatEntry>, StorageError> {
        let sql = format!(
            "SELECT * FROM {} WHERE sid = ? AND chat_id = ?",
            self.settings.chat_table()
        );

        let row = sqlx::query(&sql)
            .bind(sid)
            .bind(cid)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let chat_row =
                    ChatRow::from_row(&row).map_err(|e| StorageError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_entry()?))
            }
            None => Ok(None),
        }
    }

    /// Update a chat's title.
    ///
    /// Zero rows affected is a successful no-op; a missing chat is never
    /// fabricated here.
    pub async fn update_title(
        &self,
        sid: &str,
        cid: &str,
        title: &str,
    ) -> Result<(), StorageError> {
        let sql = format!(
            "UPDATE {} SET title = ?, updated_at = ? WHERE sid = ? AND chat_id = ?",
            self.settings.chat_table()
        );

        sqlx::query(&sql)
            .bind(title)
            .bind(format_datetime(&Utc::now()))
            .bind(sid)
            .bind(cid)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    /// List a session's chats, filtered and paginated.
    ///
    /// Returns the page of rows plus the total row count under the same
    /// predicate, counted before pagination.
    pub async fn list(
        &self,
        sid: &str,
        filter: &ChatFilter,
    ) -> Result<(Vec<ChatEntry>, u64), StorageError> {
        let table = self.settings.chat_table();
        let keyword_pattern = filter
            .keywords
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{k}%"));

        let mut where_clause = String::from("sid = ?");
        if keyword_pattern.is_some() {
            where_clause.push_str(" AND title LIKE ?");
        }

        let count_sql = format!("SELECT COUNT(*) as cnt FROM {table} WHERE {where_clause}");
        let mut count_query = sqlx::query(&count_sql).bind(sid);
        if let Some(ref pattern) = keyword_pattern {
            count_query = count_query.bind(pattern);
        }
        let count_row = count_query
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let total: i64 = count_row
            .try_get("cnt")
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let direction = match filter.order() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let page_size = filter.page_size();
        let offset = (filter.page() as u64 - 1) * page_size as u64;
        let select_sql = format!(
            "SELECT * FROM {table} WHERE {where_clause}
             ORDER BY created_at {direction}, id {direction} LIMIT {page_size} OFFSET {offset}"
        );

        let mut select_query = sqlx::query(&select_sql).bind(sid);
        if let Some(ref pattern) = keyword_pattern {
            select_query = select_query.bind(pattern);
        }
        let rows = select_query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            let chat_row =
                ChatRow::from_row(row).map_err(|e| StorageError::Query(e.to_string()))?;
            chats.push(chat_row.into_entry()?);
        }

        Ok((chats, total as u64))
    }

    /// Delete one chat and all of its history rows.
    pub async fn delete(&self, sid: &str, cid: &str) -> Result<(), StorageError> {
        let history_sql = format!(
            "DELETE FROM {} WHERE sid = ? AND cid = ?",
            self.settings.history_table()
        );
        let chat_sql = format!(
            "DELETE FROM {} WHERE sid = ? AND chat_id = ?",
            self.settings.chat_table()
        );

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        // History first: a crash between the two leaves orphaned history,
        // never a chat row pointing at deleted history.
        sqlx::query(&history_sql)
            .bind(sid)
            .bind(cid)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        sqlx::query(&chat_sql)
            .bind(sid)
            .bind(cid)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        tracing::debug!(sid, cid, "chat deleted");
        Ok(())
    }

    /// Delete every chat and history row owned by a session.
    pub async fn delete_all(&self, sid: &str) -> Result<(), StorageError> {
        let history_sql = format!(
            "DELETE FROM {} WHERE sid = ?",
            self.settings.history_table()
        );
        let chat_sql = format!("DELETE FROM {} WHERE sid = ?", self.settings.chat_table());

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        sqlx::query(&history_sql)
            .bind(sid)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        sqlx::query(&chat_sql)
            .bind(sid)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        tracing::debug!(sid, "all chats deleted for session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::history::SqliteHistoryStore;
    use crate::sqlite::schema::ensure_schema;
    use parley_types::history::{MessageRole, NewMessage};

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        let pool = DatabasePool::new(&url).await.unwrap();
        ensure_schema(&pool, &StoreSettings::default()).await.unwrap();
        pool
    }

    fn directory(pool: &DatabasePool) -> SqliteChatDirectory {
        SqliteChatDirectory::new(pool.clone(), StoreSettings::default())
    }

    #[tokio::test]
    async fn test_ensure_creates_untitled_chat() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        chats.ensure("s1", "c1").await.unwrap();

        let entry = chats.get("s1", "c1").await.unwrap().unwrap();
        assert_eq!(entry.chat_id, "c1");
        assert!(entry.title.is_none());
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        chats.ensure("s1", "c1").await.unwrap();
        chats.update_title("s1", "c1", "Named").await.unwrap();
        chats.ensure("s1", "c1").await.unwrap();

        // The second ensure must not reset the row.
        let entry = chats.get("s1", "c1").await.unwrap().unwrap();
        assert_eq!(entry.title.as_deref(), Some("Named"));

        let (_, total) = chats.list("s1", &ChatFilter::default()).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        assert!(chats.get("s1", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_chat_id_different_sessions() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        chats.ensure("s1", "shared").await.unwrap();
        chats.ensure("s2", "shared").await.unwrap();
        chats.update_title("s1", "shared", "Mine").await.unwrap();

        let other = chats.get("s2", "shared").await.unwrap().unwrap();
        assert!(other.title.is_none());
    }

    #[tokio::test]
    async fn test_update_title_missing_is_noop() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        chats.update_title("s1", "ghost", "Boo").await.unwrap();
        assert!(chats.get("s1", "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keywords_and_total() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        for (cid, title) in [("c1", "Rust questions"), ("c2", "Dinner plans"), ("c3", "More Rust")] {
            chats.ensure("s1", cid).await.unwrap();
            chats.update_title("s1", cid, title).await.unwrap();
        }

        let filter = ChatFilter {
            keywords: Some("Rust".to_string()),
            ..Default::default()
        };
        let (rows, total) = chats.list("s1", &filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|c| c.title.as_deref().unwrap().contains("Rust")));
    }

    #[tokio::test]
    async fn test_list_pagination_counts_filtered_rows() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        for i in 0..5 {
            chats.ensure("s1", &format!("c{i}")).await.unwrap();
        }

        let filter = ChatFilter {
            page: Some(2),
            page_size: Some(2),
            ..Default::default()
        };
        let (rows, total) = chats.list("s1", &filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_list_order_by_created_at() {
        let pool = test_pool().await;
        let chats = directory(&pool);

        // Distinct created_at stamps, oldest first.
        for (i, cid) in ["old", "mid", "new"].iter().enumerate() {
            sqlx::query(
                "INSERT INTO conversation_chat (chat_id, title, sid, created_at) VALUES (?, NULL, ?, ?)",
            )
            .bind(cid)
            .bind("s1")
            .bind(format!("2024-06-{:02}T12:00:00+00:00", 10 + i))
            .execute(&pool.writer)
            .await
            .unwrap();
        }

        let (desc, _) = chats.list("s1", &ChatFilter::default()).await.unwrap();
        assert_eq!(desc[0].chat_id, "new");

        let asc_filter = ChatFilter {
            order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let (asc, _) = chats.list("s1", &asc_filter).await.unwrap();
        assert_eq!(asc[0].chat_id, "old");
    }

    #[tokio::test]
    async fn test_delete_removes_chat_and_history() {
        let pool = test_pool().await;
        let chats = directory(&pool);
        let history = SqliteHistoryStore::new(pool.clone(), StoreSettings::default());

        chats.ensure("s1", "c1").await.unwrap();
        history
            .append(
                "s1",
                "c1",
                None,
                &[NewMessage::new(MessageRole::User, "test message")],
                None,
            )
            .await
            .unwrap();

        chats.delete("s1", "c1").await.unwrap();

        assert!(chats.get("s1", "c1").await.unwrap().is_none());
        assert!(history.get("s1", "c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_is_scoped_to_session() {
        let pool = test_pool().await;
        let chats = directory(&pool);
        let history = SqliteHistoryStore::new(pool.clone(), StoreSettings::default());

        for sid in ["s1", "s2"] {
            chats.ensure(sid, "c1").await.unwrap();
            history
                .append(
                    sid,
                    "c1",
                    None,
                    &[NewMessage::new(MessageRole::User, "hello")],
                    None,
                )
                .await
                .unwrap();
        }

        chats.delete_all("s1").await.unwrap();

        let (_, s1_total) = chats.list("s1", &ChatFilter::default()).await.unwrap();
        assert_eq!(s1_total, 0);
        assert!(history.get("s1", "c1").await.unwrap().is_empty());

        let (_, s2_total) = chats.list("s2", &ChatFilter::default()).await.unwrap();
        assert_eq!(s2_total, 1);
        assert_eq!(history.get("s2", "c1").await.unwrap().len(), 1);
    }
}
