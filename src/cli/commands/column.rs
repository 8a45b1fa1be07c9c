//! Column command implementations.

use crate::cli::ColumnCommands;
use crate::cli::commands::{open_store, print_json, resolve_actor};
use crate::error::{Error, Result};
use crate::model::{Column, ColumnUpdate};
use crate::status;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ColumnListOutput<'a> {
    columns: Vec<ColumnSummary<'a>>,
    count: usize,
}

#[derive(Serialize)]
struct ColumnSummary<'a> {
    #[serde(flatten)]
    column: &'a Column,
    status: status::ColumnStatus,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a str,
    deleted: bool,
}

/// Execute column commands.
///
/// # Errors
///
/// Returns an error if the database can't be opened or the operation fails.
pub fn execute(
    command: &ColumnCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let mut store = open_store(db_path, &actor)?;

    match command {
        ColumnCommands::Add {
            board_id,
            name,
            position,
        } => {
            let column = store.create_column(board_id, name, *position, &actor)?;
            if json {
                print_json(&column)?;
            } else {
                println!(
                    "{} {} {} at position {}",
                    "Added column".green(),
                    column.name.bold(),
                    column.id.dimmed(),
                    column.position
                );
            }
        }
        ColumnCommands::List { board_id } => {
            if store.get_board(board_id)?.is_none() {
                return Err(Error::BoardNotFound { id: board_id.clone() });
            }
            let columns = store.list_columns(board_id)?;
            let summaries: Vec<ColumnSummary<'_>> = columns
                .iter()
                .map(|column| ColumnSummary {
                    column,
                    status: status::classify(&column.name),
                })
                .collect();
            if json {
                print_json(&ColumnListOutput {
                    count: summaries.len(),
                    columns: summaries,
                })?;
            } else {
                for summary in &summaries {
                    println!(
                        "  {}. {} {} {} ({} tasks)",
                        summary.column.position,
                        summary.column.name.bold(),
                        summary.column.id.dimmed(),
                        format!("[{}]", summary.status).dimmed(),
                        summary.column.task_ids.len()
                    );
                }
            }
        }
        ColumnCommands::Rename { id, name } => {
            let column = store.update_column(
                id,
                ColumnUpdate {
                    name: Some(name.clone()),
                },
                &actor,
            )?;
            if json {
                print_json(&column)?;
            } else {
                println!("{} {}", "Renamed column to".green(), column.name.bold());
            }
        }
        ColumnCommands::Reorder {
            board_id,
            column_ids,
        } => {
            let board = store.reorder_columns(board_id, column_ids, &actor)?;
            if json {
                print_json(&board)?;
            } else {
                println!("{} {}", "Reordered columns of".green(), board.name.bold());
            }
        }
        ColumnCommands::Delete { id } => {
            if !store.delete_column(id, &actor)? {
                return Err(Error::ColumnNotFound { id: id.clone() });
            }
            if json {
                print_json(&DeleteOutput { id, deleted: true })?;
            } else {
                println!("{} {}", "Deleted column".red(), id);
            }
        }
    }

    Ok(())
}
