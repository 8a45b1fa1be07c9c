//! Stale-task listing and the one-shot backlog sweep.

use crate::backlog::{StaleTask, sweep_stale_tasks};
use crate::cli::commands::{format_date, open_store, print_json, resolve_actor, truncate};
use crate::config::StoreConfig;
use crate::error::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Serialize)]
struct StaleOutput<'a> {
    threshold_days: u32,
    tasks: &'a [StaleTask],
    count: usize,
}

/// List stale tasks without moving them.
///
/// # Errors
///
/// Returns an error if the database can't be opened or a query fails.
pub fn execute_stale(
    days: Option<u32>,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = StoreConfig::from_env()?;
    let days = days.unwrap_or(config.stale_threshold_days);
    let actor = resolve_actor(actor);
    let store = open_store(db_path, &actor)?;

    let stale = store.find_stale_tasks(days)?;
    if json {
        return print_json(&StaleOutput {
            threshold_days: days,
            tasks: &stale,
            count: stale.len(),
        });
    }
    if stale.is_empty() {
        println!("No tasks idle for more than {days} days.");
        return Ok(());
    }
    println!("Stale tasks ({} idle > {days} days):", stale.len());
    println!();
    for entry in &stale {
        println!(
            "  {} {} {} {}",
            entry.task.id.dimmed(),
            truncate(&entry.task.content, 50),
            format!("in {}", entry.column.name).dimmed(),
            format!("last active {}", format_date(entry.task.last_activity())).dimmed()
        );
    }
    Ok(())
}

/// Run one backlog sweep now.
///
/// # Errors
///
/// Returns an error if the database can't be opened or a move fails.
pub fn execute_sweep(
    days: Option<u32>,
    batch: Option<usize>,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let config = StoreConfig::from_env()?;
    let days = days.unwrap_or(config.stale_threshold_days);
    let batch = batch.unwrap_or(config.sweep_batch_size);
    let actor = resolve_actor(actor);
    let store = Arc::new(Mutex::new(open_store(db_path, &actor)?));

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(sweep_stale_tasks(&store, days, batch, &actor))?;

    if json {
        return print_json(&report);
    }
    if report.moved.is_empty() {
        println!("Nothing to sweep.");
    } else {
        println!(
            "{} {} task(s) to backlog",
            "Moved".green(),
            report.moved.len().to_string().bold()
        );
        if report.backlog_columns_created > 0 {
            println!("  Created {} backlog column(s)", report.backlog_columns_created);
        }
    }
    if report.skipped > 0 {
        println!("  Skipped {} task(s) that changed during the sweep", report.skipped);
    }
    Ok(())
}
