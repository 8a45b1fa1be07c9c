//! SQLite storage layer for Boardkeep.
//!
//! Entities live as JSON documents in per-kind tables with an indexed parent
//! column. Every write goes through [`Store::mutate`], which runs in one
//! transaction, records audit events, invalidates cached lists and notifies
//! subscribers once after commit.
//!
//! # Submodules
//!
//! - [`cache`] - TTL cache for list queries
//! - [`cascade`] - Deletes that remove whole subtrees
//! - [`documents`] - Typed document rows
//! - [`events`] - Audit event storage
//! - [`integrity`] - Referential consistency checks
//! - [`moves`] - Task moves and dwell time
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - The [`Store`] itself
//! - [`startup`] - Open with a deadline and in-memory fallback

pub mod cache;
pub mod cascade;
pub mod documents;
pub mod events;
pub mod integrity;
pub mod migrations;
pub mod moves;
pub mod schema;
pub mod sqlite;
pub mod startup;

pub use cache::{CacheKey, DEFAULT_CACHE_TTL};
pub use integrity::{IntegrityViolation, StoreContents};
pub use sqlite::{
    DEFAULT_BOARD_NAME, DEFAULT_WORKSPACE_NAME, MutationContext, SAMPLE_TASK_CONTENT, Store,
};
pub use startup::{Startup, initialize};
