//! Atomic snapshot files.
//!
//! Snapshots are written to a sibling temp file, synced to disk and renamed
//! over the target, so a crash never leaves a half-written snapshot behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::sync::types::Snapshot;

/// Write content to a file atomically.
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write a snapshot as pretty-printed JSON.
///
/// # Errors
///
/// Returns `Export` if serialization or the write fails.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| Error::Export(format!("cannot serialize snapshot: {e}")))?;
    atomic_write(path, &json)
        .map_err(|e| Error::Export(format!("cannot write {}: {e}", path.display())))
}

/// Read a snapshot file's raw text. Parsing and validation happen on import.
///
/// # Errors
///
/// Returns `Import` if the file is missing or unreadable.
pub fn read_snapshot_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Import(format!("snapshot not found: {}", path.display())));
    }
    fs::read_to_string(path)
        .map_err(|e| Error::Import(format!("cannot read {}: {e}", path.display())))
}

/// Size of a file in bytes, 0 if it doesn't exist.
#[must_use]
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreContents;
    use crate::sync::types::FORMAT_VERSION;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_and_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("board.json");

        atomic_write(&path, "{\"a\":1}").unwrap();
        atomic_write(&path, "{\"a\":2}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":2}");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_then_read_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snap.json");
        let snapshot = Snapshot {
            version: FORMAT_VERSION,
            exported_at: "2026-01-20T00:00:00Z".into(),
            checksum: None,
            contents: StoreContents::default(),
        };

        write_snapshot(&path, &snapshot).unwrap();
        let text = read_snapshot_file(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["tasks"].as_array().unwrap().is_empty());
        assert!(value.get("checksum").is_none());
        assert!(file_size(&path) > 0);
    }

    #[test]
    fn test_missing_file_is_import_error() {
        let result = read_snapshot_file(Path::new("/nonexistent/snap.json"));
        assert!(matches!(result, Err(Error::Import(_))));
    }
}
