//! Workspace item command implementations.

use crate::cli::ItemCommands;
use crate::cli::commands::{open_store, print_json, resolve_actor, truncate};
use crate::error::{Error, Result};
use crate::model::{ItemType, NewItem, WorkspaceItem};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ItemListOutput<'a> {
    items: &'a [WorkspaceItem],
    count: usize,
}

#[derive(Serialize)]
struct LinkOutput<'a> {
    item_id: &'a str,
    task_id: &'a str,
    linked: bool,
    changed: bool,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a str,
    deleted: bool,
}

/// Parse `key=value` metadata arguments.
fn parse_meta(entries: &[String]) -> Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("Invalid metadata '{entry}'. Expected key=value"))
                })
        })
        .collect()
}

/// Execute workspace item commands.
///
/// # Errors
///
/// Returns an error if the database can't be opened or the operation fails.
pub fn execute(
    command: &ItemCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let mut store = open_store(db_path, &actor)?;

    match command {
        ItemCommands::Create {
            board_id,
            content,
            item_type,
            meta,
        } => {
            let mut draft = NewItem::new(ItemType::parse(item_type), content.as_str());
            for (key, value) in parse_meta(meta)? {
                draft = draft.with_meta(&key, &value);
            }
            let item = store.create_item(board_id, draft, &actor)?;
            if json {
                print_json(&item)?;
            } else {
                println!(
                    "{} {} {}",
                    format!("Created {}", item.item_type.as_str()).green(),
                    truncate(&item.content, 60).bold(),
                    item.id.dimmed()
                );
            }
        }
        ItemCommands::List { board_id } => {
            if store.get_board(board_id)?.is_none() {
                return Err(Error::BoardNotFound { id: board_id.clone() });
            }
            let items = store.list_items(board_id)?;
            if json {
                print_json(&ItemListOutput {
                    items: &items,
                    count: items.len(),
                })?;
            } else if items.is_empty() {
                println!("No items found.");
            } else {
                for item in items.iter() {
                    println!(
                        "  {} {} {} ({} linked tasks)",
                        item.id.dimmed(),
                        format!("[{}]", item.item_type.as_str()).dimmed(),
                        truncate(&item.content, 60),
                        item.linked_task_ids.len()
                    );
                }
            }
        }
        ItemCommands::Link { item_id, task_id } => {
            let changed = store.link_item(item_id, task_id, &actor)?;
            if json {
                print_json(&LinkOutput {
                    item_id,
                    task_id,
                    linked: true,
                    changed,
                })?;
            } else if changed {
                println!("{} {} ↔ {}", "Linked".green(), item_id, task_id);
            } else {
                println!("Already linked.");
            }
        }
        ItemCommands::Unlink { item_id, task_id } => {
            let changed = store.unlink_item(item_id, task_id, &actor)?;
            if json {
                print_json(&LinkOutput {
                    item_id,
                    task_id,
                    linked: false,
                    changed,
                })?;
            } else if changed {
                println!("{} {} ↔ {}", "Unlinked".yellow(), item_id, task_id);
            } else {
                println!("Not linked.");
            }
        }
        ItemCommands::Delete { id } => {
            if !store.delete_item(id, &actor)? {
                return Err(Error::ItemNotFound { id: id.clone() });
            }
            if json {
                print_json(&DeleteOutput { id, deleted: true })?;
            } else {
                println!("{} {}", "Deleted item".red(), id);
            }
        }
    }

    Ok(())
}
