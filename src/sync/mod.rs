//! Snapshot export and import.
//!
//! - **Export**: all five tables → one JSON document with version, time and
//!   checksum, written atomically
//! - **Import**: validate → copy current contents → replace every table in
//!   one transaction → restore the copy if that fails
//!
//! # File Format
//!
//! ```json
//! {"version":1,"exported_at":"2026-01-20T10:00:00Z","checksum":"ab12...",
//!  "workspaces":[...],"boards":[...],"columns":[...],"tasks":[...],"workspace_items":[...]}
//! ```

mod export;
mod file;
mod hash;
mod import;
mod types;

pub use file::{atomic_write, file_size, read_snapshot_file, write_snapshot};
pub use hash::content_hash;
pub use import::{ImportReport, parse_snapshot};
pub use types::{FORMAT_VERSION, REQUIRED_TABLES, Snapshot, TableCounts};
