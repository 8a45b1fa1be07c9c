//! Database health check.

use crate::cli::commands::{open_store, print_json, require_db_path, resolve_actor};
use crate::error::{Error, Result};
use crate::storage::IntegrityViolation;
use crate::sync::TableCounts;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct DoctorOutput<'a> {
    database: &'a PathBuf,
    ok: bool,
    counts: TableCounts,
    violations: &'a [IntegrityViolation],
}

/// Open the database, run SQLite's quick check and report every broken
/// ownership or membership reference.
///
/// # Errors
///
/// Returns `Validation` if any problem was found, after printing them.
pub fn execute(db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let path = require_db_path(db_path)?;
    let actor = resolve_actor(actor);
    let store = open_store(Some(&path), &actor)?;

    let contents = store.contents()?;
    let counts = TableCounts::of(&contents);
    let violations = crate::storage::integrity::check_contents(&contents);

    if json {
        print_json(&DoctorOutput {
            database: &path,
            ok: violations.is_empty(),
            counts,
            violations: &violations,
        })?;
    } else {
        println!("Database: {}", path.display());
        println!("  Rows: {}", counts.total());
        if violations.is_empty() {
            println!("  {}", "No problems found".green());
        } else {
            for violation in &violations {
                println!("  {} {violation}", "✗".red());
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} integrity problem(s) found",
            violations.len()
        )))
    }
}
