//! Create the Boardkeep database.
//!
//! The database lives at `~/.boardkeep/data/boardkeep.db` unless `--db`,
//! `BOARDKEEP_DB` or `BK_TEST_DB` say otherwise. A fresh database is seeded
//! with a starter workspace, board and task.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::Store;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    seeded: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, actor: &str, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or_else(|| {
        Error::Config("Could not determine the Boardkeep data directory".to_string())
    })?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        remove_database(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut store = Store::open(&db_path)?;
    let seeded = store.bootstrap_defaults(actor)?;

    if json {
        let output = InitOutput {
            database: db_path,
            seeded,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized Boardkeep database");
        println!("  Database: {}", db_path.display());
        if seeded {
            println!();
            println!("Next: Run 'bk workspace list' to see your starter board.");
        }
    }

    Ok(())
}

/// Remove a database file together with its WAL side files.
fn remove_database(path: &Path) -> Result<()> {
    fs::remove_file(path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_and_seeds() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("bk.db");

        execute(Some(&path), "tester", false, true).unwrap();
        assert!(path.exists());

        let store = Store::open(&path).unwrap();
        assert_eq!(store.list_workspaces().unwrap().len(), 1);
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bk.db");

        execute(Some(&path), "tester", false, true).unwrap();
        let result = execute(Some(&path), "tester", false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
    }

    #[test]
    fn test_init_force_starts_over() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bk.db");

        execute(Some(&path), "tester", false, true).unwrap();
        {
            let mut store = Store::open(&path).unwrap();
            store.create_workspace("Extra", "", "tester").unwrap();
        }
        execute(Some(&path), "tester", true, true).unwrap();

        let store = Store::open(&path).unwrap();
        assert_eq!(store.list_workspaces().unwrap().len(), 1);
    }
}
