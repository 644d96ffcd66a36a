//! Assistant profile types for Parley.
//!
//! Assistant profiles were historically loose field maps; here they are a
//! typed record with a fixed field list plus one dedicated `options` map for
//! vendor-specific settings, so serialization stays well-defined while the
//! opaque parts remain extensible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for an assistant, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssistantId(pub Uuid);

impl AssistantId {
    /// Create a new AssistantId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create an AssistantId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AssistantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssistantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssistantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The mutable fields of an assistant profile.
///
/// Everything a caller supplies on create/update. Identity and timestamps
/// live on [`Assistant`]; the registry owns those.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantProfile {
    /// Profile kind (stored in the `type` column, e.g. "assistant").
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Name of the LLM connector this assistant speaks through.
    pub connector: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Vendor-specific/opaque settings (model, temperature, ...).
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub prompts: Option<serde_json::Value>,
    #[serde(default)]
    pub flows: Option<serde_json::Value>,
    #[serde(default)]
    pub files: Option<serde_json::Value>,
    #[serde(default)]
    pub functions: Option<serde_json::Value>,
    /// Freeform tags; listing filters match on set intersection.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub permissions: Option<serde_json::Value>,
    #[serde(default)]
    pub automated: bool,
    #[serde(default = "default_true")]
    pub mentionable: bool,
}

fn default_kind() -> String {
    "assistant".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AssistantProfile {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            name: String::new(),
            avatar: None,
            connector: String::new(),
            description: None,
            options: serde_json::Map::new(),
            prompts: None,
            flows: None,
            files: None,
            functions: None,
            tags: Vec::new(),
            readonly: false,
            permissions: None,
            automated: false,
            mentionable: true,
        }
    }
}

/// A stored assistant: profile plus registry-owned identity and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: AssistantId,
    #[serde(flatten)]
    pub profile: AssistantProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
