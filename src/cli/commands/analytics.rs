//! Analytics command implementations.

use crate::cli::AnalyticsCommands;
use crate::cli::commands::{format_duration, open_store, print_json, resolve_actor};
use crate::error::{Error, Result};
use colored::Colorize;
use std::path::PathBuf;

/// Execute analytics commands.
///
/// # Errors
///
/// Returns an error if the database can't be opened, the entity is missing,
/// or a query fails.
pub fn execute(
    command: &AnalyticsCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let store = open_store(db_path, &actor)?;

    match command {
        AnalyticsCommands::Task { id } => {
            let stats = store
                .task_analytics(id)?
                .ok_or_else(|| Error::TaskNotFound { id: id.clone() })?;
            if json {
                return print_json(&stats);
            }
            println!("{} {}", "Task".cyan().bold(), stats.task_id.dimmed());
            println!("  Status: {}", stats.current_status);
            println!("  Moves: {}", stats.transition_count);
            println!("  Total dwell: {}", format_duration(stats.total_dwell_ms));
            match stats.cycle_time_ms {
                Some(ms) => println!("  Cycle time: {}", format_duration(ms)),
                None => println!("  Cycle time: {}", "not completed".dimmed()),
            }
            for (column_id, ms) in &stats.per_column_ms {
                println!("    {} {}", column_id.dimmed(), format_duration(*ms));
            }
        }
        AnalyticsCommands::Board { id } => {
            let stats = store
                .board_analytics(id)?
                .ok_or_else(|| Error::BoardNotFound { id: id.clone() })?;
            if json {
                return print_json(&stats);
            }
            println!("{} {}", "Board".cyan().bold(), stats.board_id.dimmed());
            println!(
                "  Completed: {}/{} ({:.0}%)",
                stats.completed_tasks,
                stats.total_tasks,
                stats.completion_rate * 100.0
            );
            println!("  Overdue: {}", stats.overdue_count);
            println!("  Moves: {}", stats.total_moves);
            println!(
                "  Average cycle time: {}",
                format_duration(millis(stats.average_cycle_time_ms))
            );
            let priorities: Vec<String> = stats
                .priority_counts
                .iter()
                .map(|(priority, n)| format!("{priority} {n}"))
                .collect();
            if !priorities.is_empty() {
                println!("  Priorities: {}", priorities.join(", "));
            }
            for column in &stats.column_counts {
                println!("    {} {}", column.name, column.tasks.to_string().bold());
            }
        }
        AnalyticsCommands::Activity => {
            let stats = store.activity_stats()?;
            if json {
                return print_json(&stats);
            }
            println!("{}", "Activity".cyan().bold());
            println!("  Tasks: {}", stats.tasks_created);
            println!("  Completed: {}", stats.tasks_completed);
            println!("  Moves: {}", stats.total_moves);
        }
    }

    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn millis(ms: f64) -> i64 {
    ms.round() as i64
}
