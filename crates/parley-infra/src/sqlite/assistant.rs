//! SQLite assistant registry.
//!
//! Stores assistant profiles as one row each, keyed by a generated
//! `assistant_id` (UUID v7). JSON-valued profile fields are serialized text
//! and round-trip exactly. Tag filtering matches the serialized array by
//! containment, OR across the requested tags.

use chrono::{DateTime, Utc};
use parley_core::store::AssistantFilter;
use parley_types::assistant::{Assistant, AssistantId, AssistantProfile};
use parley_types::config::StoreSettings;
use parley_types::error::StorageError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed assistant registry.
#[derive(Debug)]
pub struct SqliteAssistantRegistry {
    pool: DatabasePool,
    settings: StoreSettings,
}

impl SqliteAssistantRegistry {
    /// Create a new registry backed by the given database pool.
    pub fn new(pool: DatabasePool, settings: StoreSettings) -> Self {
        Self { pool, settings }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct AssistantRow {
    assistant_id: String,
    kind: String,
    name: String,
    avatar: Option<String>,
    connector: String,
    description: Option<String>,
    options: Option<String>,
    prompts: Option<String>,
    flows: Option<String>,
    files: Option<String>,
    functions: Option<String>,
    tags: Option<String>,
    readonly: bool,
    permissions: Option<String>,
    automated: bool,
    mentionable: bool,
    created_at: String,
    updated_at: String,
}

impl AssistantRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            assistant_id: row.try_get("assistant_id")?,
            kind: row.try_get("type")?,
            name: row.try_get("name")?,
            avatar: row.try_get("avatar")?,
            connector: row.try_get("connector")?,
            description: row.try_get("description")?,
            options: row.try_get("options")?,
            prompts: row.try_get("prompts")?,
            flows: row.try_get("flows")?,
            files: row.try_get("files")?,
            functions: row.try_get("functions")?,
            tags: row.try_get("tags")?,
            readonly: row.try_get("readonly")?,
            permissions: row.try_get("permissions")?,
            automated: row.try_get("automated")?,
            mentionable: row.try_get("mentionable")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_assistant(self) -> Result<Assistant, StorageError> {
        let id: AssistantId = self
            .assistant_id
            .parse()
            .map_err(|e| StorageError::Query(format!("invalid assistant id: {e}")))?;
        let options = match self.options.as_deref() {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| StorageError::Serialization(format!("invalid options JSON: {e}")))?,
            None => serde_json::Map::new(),
        };
        let tags = match self.tags.as_deref() {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| StorageError::Serialization(format!("invalid tags JSON: {e}")))?,
            None => Vec::new(),
        };
        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = parse_datetime(&self.updated_at)?;

        Ok(Assistant {
            id,
            profile: AssistantProfile {
                kind: self.kind,
                name: self.name,
                avatar: self.avatar,
                connector: self.connector,
                description: self.description,
                options,
                prompts: parse_json_opt(self.prompts.as_deref(), "prompts")?,
                flows: parse_json_opt(self.flows.as_deref(), "flows")?,
                files: parse_json_opt(self.files.as_deref(), "files")?,
                functions: parse_json_opt(self.functions.as_deref(), "functions")?,
                tags,
                readonly: self.readonly,
                permissions: parse_json_opt(self.permissions.as_deref(), "permissions")?,
                automated: self.automated,
                mentionable: self.mentionable,
            },
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

fn parse_json_opt(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<serde_json::Value>, StorageError> {
    raw.map(serde_json::from_str)
        .transpose()
        .map_err(|e| StorageError::Serialization(format!("invalid {field} JSON: {e}")))
}

fn to_json_opt(value: &Option<serde_json::Value>) -> Result<Option<String>, StorageError> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Serialized profile columns, computed once per write.
struct ProfileColumns {
    options: String,
    prompts: Option<String>,
    flows: Option<String>,
    files: Option<String>,
    functions: Option<String>,
    tags: String,
    permissions: Option<String>,
}

impl ProfileColumns {
    fn encode(profile: &AssistantProfile) -> Result<Self, StorageError> {
        Ok(Self {
            options: serde_json::to_string(&profile.options)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            prompts: to_json_opt(&profile.prompts)?,
            flows: to_json_opt(&profile.flows)?,
            files: to_json_opt(&profile.files)?,
            functions: to_json_opt(&profile.functions)?,
            tags: serde_json::to_string(&profile.tags)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            permissions: to_json_opt(&profile.permissions)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl SqliteAssistantRegistry {
    /// Register a new assistant, returning its generated id.
    pub async fn create(&self, profile: &AssistantProfile) -> Result<AssistantId, StorageError> {
        let id = AssistantId::new();
        let columns = ProfileColumns::encode(profile)?;
        let now = format_datetime(&Utc::now());

        let sql = format!(
            "INSERT INTO {} (assistant_id, type, name, avatar, connector, description, options,
                             prompts, flows, files, functions, tags, readonly, permissions,
                             automated, mentionable, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.settings.assistant_table()
        );

        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(&profile.kind)
            .bind(&profile.name)
            .bind(&profile.avatar)
            .bind(&profile.connector)
            .bind(&profile.description)
            .bind(&columns.options)
            .bind(&columns.prompts)
            .bind(&columns.flows)
            .bind(&columns.files)
            .bind(&columns.functions)
            .bind(&columns.tags)
            .bind(profile.readonly)
            .bind(&columns.permissions)
            .bind(profile.automated)
            .bind(profile.mentionable)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool.writer)
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(assistant_id = %id, name = %profile.name, "assistant created");
                Ok(id)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                StorageError::Conflict(format!("assistant '{id}' already exists")),
            ),
            Err(e) => Err(StorageError::Query(e.to_string())),
        }
    }

    /// Replace an existing assistant's profile.
    ///
    /// Returns `StorageError::NotFound` when the id is unknown.
    pub async fn update(
        &self,
        id: &AssistantId,
        profile: &AssistantProfile,
    ) -> Result<(), StorageError> {
        let columns = ProfileColumns::encode(profile)?;

        let sql = format!(
            "UPDATE {} SET type = ?, name = ?, avatar = ?, connector = ?, description = ?,
                           options = ?, prompts = ?, flows = ?, files = ?, functions = ?,
                           tags = ?, readonly = ?, permissions = ?, automated = ?,
                           mentionable = ?, updated_at = ?
             WHERE assistant_id = ?",
            self.settings.assistant_table()
        );

        let result = sqlx::query(&sql)
            .bind(&profile.kind)
            .bind(&profile.name)
            .bind(&profile.avatar)
            .bind(&profile.connector)
            .bind(&profile.description)
            .bind(&columns.options)
            .bind(&columns.prompts)
            .bind(&columns.flows)
            .bind(&columns.files)
            .bind(&columns.functions)
            .bind(&columns.tags)
            .bind(profile.readonly)
            .bind(&columns.permissions)
            .bind(profile.automated)
            .bind(profile.mentionable)
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Get one assistant by id; `None` when absent.
    pub async fn get(&self, id: &AssistantId) -> Result<Option<Assistant>, StorageError> {
        let sql = format!(
            "SELECT * FROM {} WHERE assistant_id = ?",
            self.settings.assistant_table()
        );

        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let assistant_row =
                    AssistantRow::from_row(&row).map_err(|e| StorageError::Query(e.to_string()))?;
                Ok(Some(assistant_row.into_assistant()?))
            }
            None => Ok(None),
        }
    }

    /// Remove an assistant; `StorageError::NotFound` when already absent.
    pub async fn delete(&self, id: &AssistantId) -> Result<(), StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE assistant_id = ?",
            self.settings.assistant_table()
        );

        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// List assistants matching the filter.
    ///
    /// Tag filtering is OR-semantics over the serialized tag array: a row
    /// matches when it carries any of the requested tags. Returns the page of
    /// rows plus the filtered total, counted before pagination. Newest first.
    pub async fn list(
        &self,
        filter: &AssistantFilter,
    ) -> Result<(Vec<Assistant>, u64), StorageError> {
        let table = self.settings.assistant_table();
        // Stored tags are a JSON array ('["tag1","tag2"]'), so containment of
        // the quoted tag matches exactly one element.
        let tag_patterns: Vec<String> = filter
            .tags
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| format!("%\"{t}\"%"))
            .collect();

        let where_clause = if tag_patterns.is_empty() {
            String::from("1 = 1")
        } else {
            let likes = vec!["tags LIKE ?"; tag_patterns.len()];
            format!("({})", likes.join(" OR "))
        };

        let count_sql = format!("SELECT COUNT(*) as cnt FROM {table} WHERE {where_clause}");
        let mut count_query = sqlx::query(&count_sql);
        for pattern in &tag_patterns {
            count_query = count_query.bind(pattern);
        }
        let count_row = count_query
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let total: i64 = count_row
            .try_get("cnt")
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let page_size = filter.page_size();
        let offset = (filter.page() as u64 - 1) * page_size as u64;
        let select_sql = format!(
            "SELECT * FROM {table} WHERE {where_clause}
             ORDER BY created_at DESC, id DESC LIMIT {page_size} OFFSET {offset}"
        );

        let mut select_query = sqlx::query(&select_sql);
        for pattern in &tag_patterns {
            select_query = select_query.bind(pattern);
        }
        let rows = select_query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut assistants = Vec::with_capacity(rows.len());
        for row in &rows {
            let assistant_row =
                AssistantRow::from_row(row).map_err(|e| StorageError::Query(e.to_string()))?;
            assistants.push(assistant_row.into_assistant()?);
        }

        Ok((assistants, total as u64))
    }
}
