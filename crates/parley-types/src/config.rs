//! Configuration types for the conversation store.
//!
//! `StoreSettings` controls the physical table names, history expiry, the
//! history read window, and which day boundary chat grouping uses. All
//! fields have defaults so an empty config section is valid.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Which calendar the day buckets of a chat listing follow.
///
/// Grouping labels ("Today", "Yesterday", date strings) depend on where the
/// day boundary falls; this pins the choice down explicitly instead of
/// inheriting whatever the server's clock happens to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    Utc,
    Local,
}

impl Default for DayBoundary {
    fn default() -> Self {
        DayBoundary::Utc
    }
}

/// Construction-time settings for a conversation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Prefix for the three physical tables
    /// (`<prefix>_history`, `<prefix>_chat`, `<prefix>_assistant`).
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// History time-to-live in seconds; 0 disables expiry.
    #[serde(default)]
    pub ttl_seconds: u64,

    /// Maximum number of history rows returned per chat (newest wins);
    /// 0 disables the bound.
    #[serde(default = "default_max_history")]
    pub max_history: u32,

    /// Day boundary used when bucketing chats by calendar date.
    #[serde(default)]
    pub day_boundary: DayBoundary,
}

fn default_table_prefix() -> String {
    "conversation".to_string()
}

fn default_max_history() -> u32 {
    100
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            ttl_seconds: 0,
            max_history: default_max_history(),
            day_boundary: DayBoundary::default(),
        }
    }
}

impl StoreSettings {
    /// Validate the table prefix before it is ever spliced into SQL.
    ///
    /// Table names cannot be bound as statement parameters, so the prefix is
    /// restricted to `[A-Za-z0-9_]` and must not be empty or start with a digit.
    pub fn validate(&self) -> Result<(), StorageError> {
        let prefix = &self.table_prefix;
        let mut chars = prefix.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        if !valid {
            return Err(StorageError::InvalidConfig(format!(
                "invalid table prefix: '{prefix}'"
            )));
        }
        Ok(())
    }

    pub fn history_table(&self) -> String {
        format!("{}_history", self.table_prefix)
    }

    pub fn chat_table(&self) -> String {
        format!("{}_chat", self.table_prefix)
    }

    pub fn assistant_table(&self) -> String {
        format!("{}_assistant", self.table_prefix)
    }
}
