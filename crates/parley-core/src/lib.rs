//! Core contract for Parley conversation storage.
//!
//! Defines the [`store::ConversationStore`] trait the orchestration layer
//! consumes, plus the pure query logic -- filter types, pagination math,
//! calendar-day bucketing -- shared by every backend. This crate never
//! depends on a specific storage technology; implementations live in
//! `parley-infra`.

pub mod store;
