//! Shared domain types for Parley.
//!
//! This crate contains the record types persisted by the conversation
//! storage layer -- history entries, chat entries, assistant profiles --
//! together with their error and configuration types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod history;
