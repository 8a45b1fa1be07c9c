//! Board command implementations.

use crate::cli::BoardCommands;
use crate::cli::commands::{open_store, print_json, resolve_actor, truncate};
use crate::error::{Error, Result};
use crate::model::{Board, BoardUpdate, Column, Task};
use crate::status::ColumnStatus;
use crate::storage::Store;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct BoardListOutput<'a> {
    boards: &'a [Board],
    count: usize,
}

#[derive(Serialize)]
struct ColumnView {
    #[serde(flatten)]
    column: Column,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct BoardShowOutput<'a> {
    board: &'a Board,
    columns: Vec<ColumnView>,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a str,
    deleted: bool,
}

/// Execute board commands.
///
/// # Errors
///
/// Returns an error if the database can't be opened or the operation fails.
pub fn execute(
    command: &BoardCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let mut store = open_store(db_path, &actor)?;

    match command {
        BoardCommands::Create {
            workspace_id,
            name,
            description,
        } => {
            let board = store.create_board(workspace_id, name, description, &actor)?;
            if json {
                print_json(&board)?;
            } else {
                println!("{} {} {}", "Created board".green(), board.name.bold(), board.id.dimmed());
            }
        }
        BoardCommands::List { workspace_id } => {
            if store.get_workspace(workspace_id)?.is_none() {
                return Err(Error::WorkspaceNotFound {
                    id: workspace_id.clone(),
                });
            }
            let boards = store.list_boards(workspace_id)?;
            if json {
                print_json(&BoardListOutput {
                    boards: &boards,
                    count: boards.len(),
                })?;
            } else if boards.is_empty() {
                println!("No boards found.");
            } else {
                println!("Boards ({} found):", boards.len());
                println!();
                for board in boards.iter() {
                    println!("  {} {}", board.id.dimmed(), board.name.bold());
                }
            }
        }
        BoardCommands::Show { id } => show(&store, id, json)?,
        BoardCommands::Update {
            id,
            name,
            description,
        } => {
            if name.is_none() && description.is_none() {
                return Err(Error::InvalidArgument(
                    "Nothing to update: pass --name or --description".to_string(),
                ));
            }
            let board = store.update_board(
                id,
                BoardUpdate {
                    name: name.clone(),
                    description: description.clone(),
                },
                &actor,
            )?;
            if json {
                print_json(&board)?;
            } else {
                println!("{} {}", "Updated board".green(), board.name.bold());
            }
        }
        BoardCommands::Delete { id } => {
            if !store.delete_board(id, &actor)? {
                return Err(Error::BoardNotFound { id: id.clone() });
            }
            if json {
                print_json(&DeleteOutput { id, deleted: true })?;
            } else {
                println!("{} {}", "Deleted board".red(), id);
            }
        }
    }

    Ok(())
}

fn show(store: &Store, id: &str, json: bool) -> Result<()> {
    let board = store
        .get_board(id)?
        .ok_or_else(|| Error::BoardNotFound { id: id.to_string() })?;

    let mut columns = Vec::new();
    for column in store.list_columns(id)?.iter() {
        let tasks = store.list_tasks(&column.id)?;
        columns.push(ColumnView {
            column: column.clone(),
            tasks: tasks.to_vec(),
        });
    }

    if json {
        return print_json(&BoardShowOutput {
            board: &board,
            columns,
        });
    }

    println!("{} {}", board.name.bold(), board.id.dimmed());
    if !board.description.is_empty() {
        println!("  {}", board.description);
    }
    for view in &columns {
        println!();
        println!(
            "{} {} ({})",
            view.column.name.cyan().bold(),
            view.column.id.dimmed(),
            view.tasks.len()
        );
        for task in &view.tasks {
            let icon = match task.column_status {
                ColumnStatus::Done => "✓",
                ColumnStatus::InProgress => "●",
                ColumnStatus::Todo | ColumnStatus::Other => "○",
            };
            println!(
                "  {icon} {} {} {}",
                task.id.dimmed(),
                truncate(&task.content, 60),
                format!("[{}, {}%]", task.priority, task.percent_complete).dimmed()
            );
        }
    }
    Ok(())
}
