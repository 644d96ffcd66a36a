//! Idempotent schema provisioning for the three conversation tables.
//!
//! Every statement is `CREATE ... IF NOT EXISTS`, so provisioning is safe to
//! run concurrently from multiple process instances sharing one database;
//! "already exists" is success by construction. There is no teardown: tests
//! use throwaway database files instead.

use parley_types::config::StoreSettings;
use parley_types::error::StorageError;

use super::pool::DatabasePool;

/// Ensure the history, chat, and assistant tables (and their indexes) exist.
///
/// Runs once at store construction. Fails with `StorageError::Schema` on any
/// provisioning error, which callers should treat as fatal at startup. The
/// table prefix is validated before any SQL is formatted with it.
pub async fn ensure_schema(
    pool: &DatabasePool,
    settings: &StoreSettings,
) -> Result<(), StorageError> {
    settings.validate()?;

    let history = settings.history_table();
    let chat = settings.chat_table();
    let assistant = settings.assistant_table();

    let statements = [
        format!(
            r#"CREATE TABLE IF NOT EXISTS {history} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sid TEXT NOT NULL,
                cid TEXT NOT NULL,
                rid TEXT,
                uid TEXT,
                role TEXT NOT NULL,
                name TEXT,
                content TEXT NOT NULL,
                context TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                expired_at TEXT
            )"#
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{history}_sid_cid ON {history} (sid, cid)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{history}_sid_rid ON {history} (sid, rid)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{history}_expired_at ON {history} (expired_at)"),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {chat} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL,
                title TEXT,
                sid TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                UNIQUE (sid, chat_id)
            )"#
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{chat}_sid_created ON {chat} (sid, created_at)"),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {assistant} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                assistant_id TEXT NOT NULL UNIQUE,
                type TEXT NOT NULL,
                name TEXT NOT NULL,
                avatar TEXT,
                connector TEXT NOT NULL,
                description TEXT,
                options TEXT,
                prompts TEXT,
                flows TEXT,
                files TEXT,
                functions TEXT,
                tags TEXT,
                readonly INTEGER NOT NULL DEFAULT 0,
                permissions TEXT,
                automated INTEGER NOT NULL DEFAULT 0,
                mentionable INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{assistant}_created ON {assistant} (created_at)"),
    ];

    for sql in &statements {
        sqlx::query(sql)
            .execute(&pool.writer)
            .await
            .map_err(|e| StorageError::Schema(e.to_string()))?;
    }

    tracing::debug!(prefix = %settings.table_prefix, "conversation schema ensured");
    Ok(())
}
