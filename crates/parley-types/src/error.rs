use thiserror::Error;

/// Errors from conversation storage operations.
///
/// Absence on reads is not an error: lookups return `Option::None` or an
/// empty collection instead. `NotFound` is reserved for operations that
/// promise to report it (assistant update/delete).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(StorageError::NotFound.to_string(), "entity not found");
    }

    #[test]
    fn test_invalid_config_display() {
        let err = StorageError::InvalidConfig("bad prefix".to_string());
        assert!(err.to_string().contains("bad prefix"));
    }
}
