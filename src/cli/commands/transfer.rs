//! Snapshot export and import commands.

use crate::cli::commands::{open_store, print_json, resolve_actor};
use crate::error::Result;
use crate::sync::TableCounts;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ExportOutput<'a> {
    path: &'a Path,
    counts: TableCounts,
}

fn describe(counts: &TableCounts) -> String {
    format!(
        "{} workspaces, {} boards, {} columns, {} tasks, {} items",
        counts.workspaces, counts.boards, counts.columns, counts.tasks, counts.workspace_items
    )
}

/// Write a snapshot of the whole database.
///
/// # Errors
///
/// Returns an error if the database can't be opened or the file can't be
/// written.
pub fn execute_export(
    output: &Path,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let store = open_store(db_path, &actor)?;
    let counts = store.export_to_file(output)?;

    if json {
        print_json(&ExportOutput {
            path: output,
            counts,
        })
    } else {
        println!("{} {}", "Exported to".green(), output.display());
        println!("  {}", describe(&counts));
        Ok(())
    }
}

/// Replace the database contents with a snapshot file.
///
/// # Errors
///
/// Returns `Import` if the snapshot is invalid or can't be applied; the
/// previous contents are kept in either case.
pub fn execute_import(
    input: &Path,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let mut store = open_store(db_path, &actor)?;
    let report = store.import_file(input, &actor)?;

    if json {
        print_json(&report)
    } else {
        println!("{} {}", "Imported".green(), input.display());
        println!("  {}", describe(&report.imported));
        println!("  Replaced {} rows", report.replaced.total());
        Ok(())
    }
}
