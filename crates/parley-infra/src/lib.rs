//! Infrastructure layer for Parley.
//!
//! Contains the SQLite implementation of the `ConversationStore` contract
//! defined in `parley-core`: schema provisioning, the split read/write
//! connection pool, and the per-entity stores composed by
//! [`sqlite::store::SqliteConversationStore`].

pub mod sqlite;
