//! Task command implementations.

use crate::cli::commands::{
    format_date, format_duration, format_timestamp, is_clear, open_store, parse_due_date,
    print_json, resolve_actor, truncate,
};
use crate::cli::{TaskCommands, TaskCreateArgs, TaskListArgs, TaskUpdateArgs};
use crate::error::{Error, Result};
use crate::model::{NewTask, Task, TaskUpdate};
use crate::storage::Store;
use crate::storage::events::Event;
use crate::validate::normalize_priority;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct TaskListOutput<'a> {
    tasks: &'a [Task],
    count: usize,
}

#[derive(Serialize)]
struct TaskShowOutput<'a> {
    task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [Event]>,
}

#[derive(Serialize)]
struct MoveOutput<'a> {
    task: &'a Task,
    moved: bool,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    id: &'a str,
    deleted: bool,
}

/// Execute task commands.
///
/// # Errors
///
/// Returns an error if the database can't be opened or the operation fails.
pub fn execute(
    command: &TaskCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let actor = resolve_actor(actor);
    let mut store = open_store(db_path, &actor)?;

    match command {
        TaskCommands::Create(args) => create(&mut store, args, &actor, json),
        TaskCommands::List(args) => list(&store, args, json),
        TaskCommands::Show { id, events } => show(&store, id, *events, json),
        TaskCommands::Update(args) => update(&mut store, args, &actor, json),
        TaskCommands::Move { id, to, index } => move_task(&mut store, id, to, *index, &actor, json),
        TaskCommands::Comment { id, text, author } => {
            let author = author.as_deref().unwrap_or(&actor);
            let comment = store.add_comment(id, author, text, &actor)?;
            if json {
                print_json(&comment)
            } else {
                println!("{} on {}", "Comment added".green(), id.dimmed());
                Ok(())
            }
        }
        TaskCommands::Delete { id } => {
            if !store.delete_task(id, &actor)? {
                return Err(Error::TaskNotFound { id: id.clone() });
            }
            if json {
                print_json(&DeleteOutput { id, deleted: true })
            } else {
                println!("{} {}", "Deleted task".red(), id);
                Ok(())
            }
        }
    }
}

fn create(store: &mut Store, args: &TaskCreateArgs, actor: &str, json: bool) -> Result<()> {
    let mut draft = NewTask::new(args.content.as_str()).with_priority(normalize_priority(&args.priority)?);
    draft.description.clone_from(&args.description);
    draft.labels.clone_from(&args.labels);
    draft.assignee.clone_from(&args.assignee);
    if let Some(due) = &args.due {
        draft.due_date = Some(parse_due_date(due)?);
    }

    let task = store.create_task(&args.column_id, draft, actor)?;
    if json {
        print_json(&task)
    } else {
        println!("{} {} {}", "Created task".green(), task.content.bold(), task.id.dimmed());
        Ok(())
    }
}

fn list(store: &Store, args: &TaskListArgs, json: bool) -> Result<()> {
    let tasks: Vec<Task> = match (&args.column_id, &args.board) {
        (Some(column_id), _) => {
            if store.get_column(column_id)?.is_none() {
                return Err(Error::ColumnNotFound { id: column_id.clone() });
            }
            store.list_tasks(column_id)?.to_vec()
        }
        (None, Some(board_id)) => {
            if store.get_board(board_id)?.is_none() {
                return Err(Error::BoardNotFound { id: board_id.clone() });
            }
            store.list_board_tasks(board_id)?
        }
        (None, None) => {
            return Err(Error::InvalidArgument(
                "Pass a column ID or --board <id>".to_string(),
            ));
        }
    };

    if json {
        return print_json(&TaskListOutput {
            tasks: &tasks,
            count: tasks.len(),
        });
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("Tasks ({} found):", tasks.len());
    println!();
    for task in &tasks {
        let check = if task.completed { "✓" } else { "○" };
        println!(
            "{check} {} {} {}",
            task.id.dimmed(),
            truncate(&task.content, 60),
            format!("[{}, {}, {}%]", task.column_status, task.priority, task.percent_complete)
                .dimmed()
        );
    }
    Ok(())
}

fn show(store: &Store, id: &str, with_events: bool, json: bool) -> Result<()> {
    let task = store
        .get_task(id)?
        .ok_or_else(|| Error::TaskNotFound { id: id.to_string() })?;
    let events = if with_events {
        Some(store.get_events("task", id, Some(50))?)
    } else {
        None
    };

    if json {
        return print_json(&TaskShowOutput {
            task: &task,
            events: events.as_deref(),
        });
    }

    println!("{} {}", task.content.bold(), task.id.dimmed());
    if let Some(description) = &task.description {
        println!("  {description}");
    }
    println!(
        "  Status: {} ({}%{})",
        task.column_status,
        task.percent_complete,
        if task.completed { ", completed" } else { "" }
    );
    println!("  Priority: {}", task.priority);
    if let Some(due) = task.due_date {
        println!("  Due: {}", format_date(due));
    }
    if !task.labels.is_empty() {
        println!("  Labels: {}", task.labels.join(", "));
    }
    if let Some(assignee) = &task.assignee {
        println!("  Assignee: {assignee}");
    }
    println!("  Created: {}", format_timestamp(task.created_at));
    if !task.time_in_columns.is_empty() {
        println!();
        println!("{}", "Time in columns".cyan().bold());
        for (column_id, ms) in &task.time_in_columns {
            println!("  {} {}", column_id.dimmed(), format_duration(*ms));
        }
    }
    if !task.comments.is_empty() {
        println!();
        println!("{}", "Comments".cyan().bold());
        for comment in &task.comments {
            println!(
                "  {} {}: {}",
                format_timestamp(comment.created_at).dimmed(),
                comment.author.bold(),
                comment.text
            );
        }
    }
    if let Some(events) = &events {
        println!();
        println!("{}", "History".cyan().bold());
        for event in events {
            println!(
                "  {} {} by {}",
                format_timestamp(event.created_at).dimmed(),
                event.event_type.as_str(),
                event.actor
            );
        }
    }
    Ok(())
}

/// `Some(None)` for "none", `Some(Some(v))` for a value.
fn clearable(input: Option<&String>) -> Option<Option<String>> {
    input.map(|value| (!is_clear(value)).then(|| value.clone()))
}

fn update(store: &mut Store, args: &TaskUpdateArgs, actor: &str, json: bool) -> Result<()> {
    let due_date = match args.due.as_deref() {
        None => None,
        Some(due) if is_clear(due) => Some(None),
        Some(due) => Some(Some(parse_due_date(due)?)),
    };
    let update = TaskUpdate {
        content: args.content.clone(),
        description: clearable(args.description.as_ref()),
        priority: args.priority.as_deref().map(normalize_priority).transpose()?,
        due_date,
        labels: args.labels.clone(),
        assignee: clearable(args.assignee.as_ref()),
        percent_complete: args.percent,
        completed: args.completed,
    };
    if update.is_empty() {
        return Err(Error::InvalidArgument(
            "Nothing to update: pass at least one field flag".to_string(),
        ));
    }

    let task = store.update_task(&args.id, update, actor)?;
    if json {
        print_json(&task)
    } else {
        println!(
            "{} {} ({}%)",
            "Updated task".green(),
            task.content.bold(),
            task.percent_complete
        );
        Ok(())
    }
}

fn move_task(
    store: &mut Store,
    id: &str,
    dest_column_id: &str,
    index: Option<usize>,
    actor: &str,
    json: bool,
) -> Result<()> {
    let task = store
        .get_task(id)?
        .ok_or_else(|| Error::TaskNotFound { id: id.to_string() })?;
    let source = store
        .get_column(&task.column_id)?
        .ok_or_else(|| Error::ColumnNotFound {
            id: task.column_id.clone(),
        })?;
    let source_index = source
        .task_ids
        .iter()
        .position(|t| t == id)
        .unwrap_or_default();

    let unchanged = source.id == dest_column_id && index.is_none_or(|i| i == source_index);
    let (task, moved) = if unchanged {
        (task, false)
    } else {
        let dest_index = index.unwrap_or(usize::MAX);
        let moved = store.move_task(id, &source.id, dest_column_id, source_index, dest_index, actor)?;
        (moved, true)
    };

    if json {
        print_json(&MoveOutput { task: &task, moved })
    } else if moved {
        println!(
            "{} {} {}",
            "Moved".green(),
            task.content.bold(),
            format!("[{}, {}%]", task.column_status, task.percent_complete).dimmed()
        );
        Ok(())
    } else {
        println!("Task is already there.");
        Ok(())
    }
}
