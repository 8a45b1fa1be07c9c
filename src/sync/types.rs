//! Snapshot file format.

use serde::{Deserialize, Serialize};

use crate::storage::StoreContents;

/// Version written by this build. Snapshots with a higher version are refused.
pub const FORMAT_VERSION: u32 = 1;

/// Table arrays every snapshot must carry.
pub const REQUIRED_TABLES: [&str; 5] = ["workspaces", "boards", "columns", "tasks", "workspace_items"];

/// A full copy of the store with format metadata.
///
/// Serialized flat:
/// `{"version":1,"exported_at":"...","checksum":"...","workspaces":[...],...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// RFC 3339 export time
    pub exported_at: String,
    /// SHA256 of `contents`, absent in hand-written snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(flatten)]
    pub contents: StoreContents,
}

/// Row counts of an export or import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub workspaces: usize,
    pub boards: usize,
    pub columns: usize,
    pub tasks: usize,
    pub workspace_items: usize,
}

impl TableCounts {
    #[must_use]
    pub fn of(contents: &StoreContents) -> Self {
        Self {
            workspaces: contents.workspaces.len(),
            boards: contents.boards.len(),
            columns: contents.columns.len(),
            tasks: contents.tasks.len(),
            workspace_items: contents.workspace_items.len(),
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.workspaces + self.boards + self.columns + self.tasks + self.workspace_items
    }
}
