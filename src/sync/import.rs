//! Snapshot import.
//!
//! Import is all-or-nothing from the caller's side. The snapshot is
//! validated in full before anything is touched; then the current contents
//! are copied as a rollback point and every table is replaced in one
//! transaction. If the replacement fails, the rollback copy is written back
//! before the error is returned.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::storage::events::EventType;
use crate::storage::integrity::check_contents;
use crate::storage::sqlite::replace_contents_tx;
use crate::storage::{Store, StoreContents};
use crate::sync::file::read_snapshot_file;
use crate::sync::hash::content_hash;
use crate::sync::types::{FORMAT_VERSION, REQUIRED_TABLES, Snapshot, TableCounts};

/// Row counts before and after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub replaced: TableCounts,
    pub imported: TableCounts,
}

/// Parse and validate snapshot text without touching any store.
///
/// # Errors
///
/// Returns `Import` naming the first problem: malformed JSON, a missing or
/// non-array table, a missing or newer format version, a checksum mismatch,
/// or inconsistent references between the tables.
pub fn parse_snapshot(json: &str) -> Result<Snapshot> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::Import(format!("snapshot is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::Import("snapshot must be a JSON object".into()))?;

    for table in REQUIRED_TABLES {
        match object.get(table) {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(Error::Import(format!("`{table}` must be an array"))),
            None => return Err(Error::Import(format!("snapshot is missing the `{table}` array"))),
        }
    }

    let version = object
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Import("snapshot has no format version".into()))?;
    if version > u64::from(FORMAT_VERSION) {
        return Err(Error::Import(format!(
            "snapshot format {version} is newer than supported format {FORMAT_VERSION}"
        )));
    }

    let snapshot: Snapshot = serde_json::from_value(value)
        .map_err(|e| Error::Import(format!("malformed snapshot: {e}")))?;

    if let Some(expected) = &snapshot.checksum {
        if content_hash(&snapshot.contents)? != *expected {
            return Err(Error::Import("snapshot checksum does not match its contents".into()));
        }
    }

    let violations = check_contents(&snapshot.contents);
    if let Some(first) = violations.first() {
        return Err(Error::Import(format!(
            "snapshot is inconsistent ({} problem(s)), first: {first}",
            violations.len()
        )));
    }

    Ok(snapshot)
}

impl Store {
    fn replace_all(&mut self, op: &str, actor: &str, contents: &StoreContents, event: EventType) -> Result<()> {
        self.mutate(op, actor, |tx, ctx| {
            replace_contents_tx(tx, ctx, contents)?;
            ctx.record_event("store", "snapshot", event);
            Ok(())
        })
    }

    /// Replace the whole store with the snapshot in `json`.
    ///
    /// # Errors
    ///
    /// Returns `Import` if the snapshot is invalid (nothing is touched) or
    /// if writing it fails (previous contents are restored first).
    pub fn import_json(&mut self, json: &str, actor: &str) -> Result<ImportReport> {
        let snapshot = parse_snapshot(json)?;
        let rollback = self.contents()?;
        let report = ImportReport {
            replaced: TableCounts::of(&rollback),
            imported: TableCounts::of(&snapshot.contents),
        };

        if let Err(err) = self.replace_all("import", actor, &snapshot.contents, EventType::ImportApplied) {
            tracing::warn!(error = %err, "import failed, restoring previous contents");
            if let Err(restore_err) =
                self.replace_all("import_restore", actor, &rollback, EventType::ImportRestored)
            {
                tracing::error!(error = %restore_err, "restoring previous contents failed");
                return Err(Error::Import(format!(
                    "{err}; restoring previous contents also failed: {restore_err}"
                )));
            }
            return Err(Error::Import(err.to_string()));
        }

        tracing::info!(
            rows = report.imported.total(),
            replaced = report.replaced.total(),
            "imported snapshot"
        );
        Ok(report)
    }

    /// [`Store::import_json`] reading the snapshot from `path`.
    ///
    /// # Errors
    ///
    /// See [`Store::import_json`]; also `Import` if the file can't be read.
    pub fn import_file(&mut self, path: &Path, actor: &str) -> Result<ImportReport> {
        let json = read_snapshot_file(path)?;
        self.import_json(&json, actor)
    }
}
