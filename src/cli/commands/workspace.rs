//! Workspace command implementations.

use crate::cli::WorkspaceCommands;
use crate::cli::commands::{format_date, open_store, print_json, resolve_actor};
use crate::error::{Error, Result};
use crate::model::{Board, Workspace, WorkspaceUpdate};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct WorkspaceListOutput<'a> {
    workspaces: &'a [Workspace],
    count: usize,
}

#[derive(Serialize)]
struct WorkspaceShowOutput<'a> {
    workspace: &'a Workspace,
    boards: &'a [Board],
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a str,
    deleted: bool,
}

/// Execute workspace commands.
///
/// # Errors
///
/// Returns an error if the database can't be opened or the operation fails.
pub fn execute(
    command: &WorkspaceCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let mut store = open_store(db_path, &actor)?;

    match command {
        WorkspaceCommands::Create { name, description } => {
            let ws = store.create_workspace(name, description, &actor)?;
            if json {
                print_json(&ws)?;
            } else {
                println!("{} {} {}", "Created workspace".green(), ws.name.bold(), ws.id.dimmed());
            }
        }
        WorkspaceCommands::List => {
            let workspaces = store.list_workspaces()?;
            if json {
                print_json(&WorkspaceListOutput {
                    workspaces: &workspaces,
                    count: workspaces.len(),
                })?;
            } else if workspaces.is_empty() {
                println!("No workspaces found.");
            } else {
                println!("Workspaces ({} found):", workspaces.len());
                println!();
                for ws in workspaces.iter() {
                    println!(
                        "  {} {} ({} boards)",
                        ws.id.dimmed(),
                        ws.name.bold(),
                        ws.board_ids.len()
                    );
                }
            }
        }
        WorkspaceCommands::Show { id } => {
            let ws = store
                .get_workspace(id)?
                .ok_or_else(|| Error::WorkspaceNotFound { id: id.clone() })?;
            let boards = store.list_boards(id)?;
            if json {
                print_json(&WorkspaceShowOutput {
                    workspace: &ws,
                    boards: &boards,
                })?;
            } else {
                println!("{} {}", ws.name.bold(), ws.id.dimmed());
                if !ws.description.is_empty() {
                    println!("  {}", ws.description);
                }
                println!("  Created: {}", format_date(ws.created_at));
                println!();
                if boards.is_empty() {
                    println!("  No boards yet.");
                }
                for board in boards.iter() {
                    println!(
                        "  {} {} ({} columns)",
                        board.id.dimmed(),
                        board.name,
                        board.column_ids.len()
                    );
                }
            }
        }
        WorkspaceCommands::Update {
            id,
            name,
            description,
        } => {
            if name.is_none() && description.is_none() {
                return Err(Error::InvalidArgument(
                    "Nothing to update: pass --name or --description".to_string(),
                ));
            }
            let ws = store.update_workspace(
                id,
                WorkspaceUpdate {
                    name: name.clone(),
                    description: description.clone(),
                },
                &actor,
            )?;
            if json {
                print_json(&ws)?;
            } else {
                println!("{} {}", "Updated workspace".green(), ws.name.bold());
            }
        }
        WorkspaceCommands::Delete { id } => {
            if !store.delete_workspace(id, &actor)? {
                return Err(Error::WorkspaceNotFound { id: id.clone() });
            }
            if json {
                print_json(&DeleteOutput { id, deleted: true })?;
            } else {
                println!("{} {}", "Deleted workspace".red(), id);
            }
        }
    }

    Ok(())
}
