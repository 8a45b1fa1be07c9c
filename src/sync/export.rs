//! Snapshot export.
//!
//! An export is a full copy of all five tables plus the format version, the
//! export time and a checksum. It never modifies the store.

use std::path::Path;

use chrono::Utc;

use crate::error::Result;
use crate::storage::Store;
use crate::sync::file::write_snapshot;
use crate::sync::hash::content_hash;
use crate::sync::types::{FORMAT_VERSION, Snapshot, TableCounts};

impl Store {
    /// Snapshot every table.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the tables fails.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        let contents = self.contents()?;
        let checksum = content_hash(&contents)?;
        Ok(Snapshot {
            version: FORMAT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            checksum: Some(checksum),
            contents,
        })
    }

    /// Snapshot every table into `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns `Export` if the file cannot be written.
    pub fn export_to_file(&self, path: &Path) -> Result<TableCounts> {
        let snapshot = self.export_snapshot()?;
        write_snapshot(path, &snapshot)?;
        let counts = TableCounts::of(&snapshot.contents);
        tracing::info!(path = %path.display(), rows = counts.total(), "exported snapshot");
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use tempfile::TempDir;

    #[test]
    fn test_export_covers_every_table() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();

        let snapshot = store.export_snapshot().unwrap();
        assert_eq!(snapshot.version, FORMAT_VERSION);
        assert!(chrono::DateTime::parse_from_rfc3339(&snapshot.exported_at).is_ok());
        assert_eq!(
            snapshot.checksum.as_deref(),
            Some(content_hash(&snapshot.contents).unwrap().as_str())
        );
        let counts = TableCounts::of(&snapshot.contents);
        assert_eq!(
            (counts.workspaces, counts.boards, counts.columns, counts.tasks),
            (1, 1, 3, 1)
        );
    }

    #[test]
    fn test_export_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.json");
        let mut store = Store::open_memory().unwrap();
        store.bootstrap_defaults("tester").unwrap();

        let counts = store.export_to_file(&path).unwrap();
        assert_eq!(counts.total(), 1 + 1 + 3 + 1);
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.contents, store.contents().unwrap());
    }
}
