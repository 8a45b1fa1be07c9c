//! Boardkeep - kanban boards in a local database
//!
//! This crate provides the core of the `bk` CLI: an entity store for
//! workspaces, boards, columns, tasks and workspace items with transactional
//! writes, cached list queries, status inference from column names, moves
//! with dwell-time tracking, cascading deletes, change notifications,
//! analytics, a backlog sweep, and snapshot export/import.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Workspace, Board, Column, Task, WorkspaceItem)
//! - [`storage`] - SQLite document store, cache, moves and cascades
//! - [`status`] - Column-name classification
//! - [`analytics`] - Memoized task and board statistics
//! - [`backlog`] - Stale-task detection and the periodic sweep
//! - [`notify`] - Change notification bus
//! - [`sync`] - Snapshot export/import
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analytics;
pub mod backlog;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod status;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
