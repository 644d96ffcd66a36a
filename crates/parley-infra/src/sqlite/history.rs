//! SQLite history store.
//!
//! Append-only log of message turns scoped to `(sid, cid)`. Rows carry an
//! optional `expired_at` stamp; reads filter expired rows at query time, and
//! physical removal only happens through `prune_expired`. Follows the same
//! patterns as the chat and assistant stores: raw queries, a private Row
//! struct, split reader/writer pool usage.

use chrono::{DateTime, Duration, Utc};
use parley_types::config::StoreSettings;
use parley_types::error::StorageError;
use parley_types::history::{HistoryEntry, MessageRole, NewMessage};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed history store.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    pool: DatabasePool,
    settings: StoreSettings,
}

impl SqliteHistoryStore {
    /// Create a new history store backed by the given database pool.
    pub fn new(pool: DatabasePool, settings: StoreSettings) -> Self {
        Self { pool, settings }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct HistoryRow {
    id: i64,
    sid: String,
    cid: String,
    rid: Option<String>,
    uid: Option<String>,
    role: String,
    name: Option<String>,
    content: String,
    context: Option<String>,
    created_at: String,
    updated_at: Option<String>,
    expired_at: Option<String>,
}

impl HistoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sid: row.try_get("sid")?,
            cid: row.try_get("cid")?,
            rid: row.try_get("rid")?,
            uid: row.try_get("uid")?,
            role: row.try_get("role")?,
            name: row.try_get("name")?,
            content: row.try_get("content")?,
            context: row.try_get("context")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            expired_at: row.try_get("expired_at")?,
        })
    }

    fn into_entry(self) -> Result<HistoryEntry, StorageError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| StorageError::Query(e))?;
        let context = self
            .context
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| StorageError::Serialization(format!("invalid context JSON: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = self.updated_at.as_deref().map(parse_datetime).transpose()?;
        let expired_at = self.expired_at.as_deref().map(parse_datetime).transpose()?;

        Ok(HistoryEntry {
            id: self.id,
            sid: self.sid,
            cid: self.cid,
            rid: self.rid,
            uid: self.uid,
            role,
            name: self.name,
            content: self.content,
            context,
            created_at,
            updated_at,
            expired_at,
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

impl SqliteHistoryStore {
    /// Append a batch of messages for `(sid, cid)` in one transaction.
    ///
    /// All rows share one `created_at` stamp, the batch-level `context`
    /// snapshot, and the request tag when given. With a TTL configured,
    /// `expired_at = created_at + TTL` is stamped at write time.
    pub async fn append(
        &self,
        sid: &str,
        cid: &str,
        rid: Option<&str>,
        messages: &[NewMessage],
        context: Option<&serde_json::Value>,
    ) -> Result<(), StorageError> {
        if messages.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let created_at = format_datetime(&now);
        let expired_at = if self.settings.ttl_seconds > 0 {
            Some(format_datetime(
                &(now + Duration::seconds(self.settings.ttl_seconds as i64)),
            ))
        } else {
            None
        };
        let context_json = context
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let sql = format!(
            "INSERT INTO {} (sid, cid, rid, uid, role, name, content, context, created_at, expired_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.settings.history_table()
        );

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        for message in messages {
            sqlx::query(&sql)
                .bind(sid)
                .bind(cid)
                .bind(rid)
                .bind(&message.uid)
                .bind(message.role.to_string())
                .bind(&message.name)
                .bind(&message.content)
                .bind(&context_json)
                .bind(&created_at)
                .bind(&expired_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        tracing::debug!(sid, cid, count = messages.len(), "history appended");
        Ok(())
    }

    /// Get the non-expired history for `(sid, cid)` in conversation order.
    ///
    /// Bounded to the newest `max_history` rows (0 = unbounded); the window
    /// is selected newest-first, then returned ascending so callers read
    /// oldest-first.
    pub async fn get(&self, sid: &str, cid: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE sid = ? AND cid = ? AND (expired_at IS NULL OR expired_at > ?)
             ORDER BY created_at DESC, id DESC",
            self.settings.history_table()
        );
        if self.settings.max_history > 0 {
            sql.push_str(&format!(" LIMIT {}", self.settings.max_history));
        }

        let rows = sqlx::query(&sql)
            .bind(sid)
            .bind(cid)
            .bind(format_datetime(&Utc::now()))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let history_row =
                HistoryRow::from_row(row).map_err(|e| StorageError::Query(e.to_string()))?;
            entries.push(history_row.into_entry()?);
        }
        entries.reverse();

        Ok(entries)
    }

    /// Get the non-expired rows tagged with a request id, oldest first.
    pub async fn get_by_request(
        &self,
        sid: &str,
        rid: &str,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let sql = format!(
            "SELECT * FROM {} WHERE sid = ? AND rid = ? AND (expired_at IS NULL OR expired_at > ?)
             ORDER BY created_at ASC, id ASC",
            self.settings.history_table()
        );

        let rows = sqlx::query(&sql)
            .bind(sid)
            .bind(rid)
            .bind(format_datetime(&Utc::now()))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let history_row =
                HistoryRow::from_row(row).map_err(|e| StorageError::Query(e.to_string()))?;
            entries.push(history_row.into_entry()?);
        }

        Ok(entries)
    }

    /// Physically delete rows past their expiry, returning the count removed.
    pub async fn prune_expired(&self) -> Result<u64, StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE expired_at IS NOT NULL AND expired_at <= ?",
            self.settings.history_table()
        );

        let result = sqlx::query(&sql)
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::debug!(removed, "expired history pruned");
        }
        Ok(removed)
    }
}
