//! Cascading deletes.
//!
//! Deleting an entity deletes its whole subtree and removes it from its
//! parent's membership list in the same transaction. Children are found by
//! their parent-id column as well as the parent's list, so rows that drifted
//! out of a list are still removed. Each delete returns `false` for an
//! unknown id and writes nothing in that case.

use rusqlite::Connection;

use super::documents::{erase, load, load_by_parent, put};
use super::events::EventType;
use super::sqlite::{MutationContext, Store, renumber_columns};
use crate::error::Result;
use crate::model::{Board, Column, Task, Workspace, WorkspaceItem, now_ms, remove_id};

impl Store {
    /// Delete a workspace and every board beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub fn delete_workspace(&mut self, id: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_workspace", actor, |tx, ctx| {
            let Some(ws) = load::<Workspace>(tx, id)? else {
                return Ok(false);
            };
            for board in load_by_parent::<Board>(tx, &ws.id)? {
                delete_board_tx(tx, ctx, &board, false)?;
            }
            erase(tx, ctx, &ws)?;
            ctx.record_event("workspace", &ws.id, EventType::WorkspaceDeleted);
            Ok(true)
        })
    }

    /// Delete a board, its columns, their tasks and the board's items.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub fn delete_board(&mut self, id: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_board", actor, |tx, ctx| {
            let Some(board) = load::<Board>(tx, id)? else {
                return Ok(false);
            };
            delete_board_tx(tx, ctx, &board, true)?;
            Ok(true)
        })
    }

    /// Delete a column and its tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub fn delete_column(&mut self, id: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_column", actor, |tx, ctx| {
            let Some(column) = load::<Column>(tx, id)? else {
                return Ok(false);
            };
            delete_column_tx(tx, ctx, &column, true)?;
            Ok(true)
        })
    }

    /// Delete a task and remove it from its column and linked items.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub fn delete_task(&mut self, id: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_task", actor, |tx, ctx| {
            let Some(task) = load::<Task>(tx, id)? else {
                return Ok(false);
            };
            delete_task_tx(tx, ctx, &task, true)?;
            Ok(true)
        })
    }

    /// Delete a workspace item and remove it from linked tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub fn delete_item(&mut self, id: &str, actor: &str) -> Result<bool> {
        self.mutate("delete_item", actor, |tx, ctx| {
            let Some(item) = load::<WorkspaceItem>(tx, id)? else {
                return Ok(false);
            };
            delete_item_tx(tx, ctx, &item)?;
            Ok(true)
        })
    }
}

/// `detach`: also remove the board from its workspace's list. Skipped when
/// the workspace itself is being deleted.
fn delete_board_tx(tx: &Connection, ctx: &mut MutationContext, board: &Board, detach: bool) -> Result<()> {
    for item in load_by_parent::<WorkspaceItem>(tx, &board.id)? {
        delete_item_tx(tx, ctx, &item)?;
    }
    for column in load_by_parent::<Column>(tx, &board.id)? {
        delete_column_tx(tx, ctx, &column, false)?;
    }
    if detach {
        if let Some(mut ws) = load::<Workspace>(tx, &board.workspace_id)? {
            if remove_id(&mut ws.board_ids, &board.id) {
                ws.updated_at = now_ms();
                put(tx, ctx, &ws)?;
            }
        }
    }
    erase(tx, ctx, board)?;
    ctx.record_event("board", &board.id, EventType::BoardDeleted);
    Ok(())
}

fn delete_column_tx(tx: &Connection, ctx: &mut MutationContext, column: &Column, detach: bool) -> Result<()> {
    for task in load_by_parent::<Task>(tx, &column.id)? {
        delete_task_tx(tx, ctx, &task, false)?;
    }
    erase(tx, ctx, column)?;
    if detach {
        if let Some(mut board) = load::<Board>(tx, &column.board_id)? {
            if remove_id(&mut board.column_ids, &column.id) {
                board.updated_at = now_ms();
                renumber_columns(tx, ctx, &board)?;
                put(tx, ctx, &board)?;
            }
        }
    }
    ctx.record_event("column", &column.id, EventType::ColumnDeleted);
    Ok(())
}

fn delete_task_tx(tx: &Connection, ctx: &mut MutationContext, task: &Task, detach: bool) -> Result<()> {
    for item_id in &task.linked_documents {
        if let Some(mut item) = load::<WorkspaceItem>(tx, item_id)? {
            if item.linked_task_ids.remove(&task.id) {
                item.updated_at = now_ms();
                put(tx, ctx, &item)?;
            }
        }
    }
    if detach {
        if let Some(mut column) = load::<Column>(tx, &task.column_id)? {
            if remove_id(&mut column.task_ids, &task.id) {
                column.updated_at = now_ms();
                put(tx, ctx, &column)?;
            }
        }
    }
    erase(tx, ctx, task)?;
    ctx.record_event("task", &task.id, EventType::TaskDeleted);
    Ok(())
}

fn delete_item_tx(tx: &Connection, ctx: &mut MutationContext, item: &WorkspaceItem) -> Result<()> {
    for task_id in &item.linked_task_ids {
        if let Some(mut task) = load::<Task>(tx, task_id)? {
            if task.linked_documents.remove(&item.id) {
                task.updated_at = now_ms();
                put(tx, ctx, &task)?;
            }
        }
    }
    erase(tx, ctx, item)?;
    ctx.record_event("item", &item.id, EventType::ItemDeleted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemType, NewItem, NewTask};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn count(store: &Store, table: &str) -> i64 {
        store
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_delete_workspace_removes_whole_subtree() {
        let mut store = Store::open_memory().unwrap();
        let doomed = store.create_workspace("Doomed", "", "tester").unwrap();
        let keep = store.create_workspace("Keep", "", "tester").unwrap();
        let kept_board = store.create_board(&keep.id, "Stays", "", "tester").unwrap();

        for b in 0..2 {
            let board = store
                .create_board(&doomed.id, &format!("B{b}"), "", "tester")
                .unwrap();
            for column_id in &board.column_ids {
                for k in 0..3 {
                    store
                        .create_task(column_id, NewTask::new(format!("t{k}")), "tester")
                        .unwrap();
                }
            }
            store
                .create_item(&board.id, NewItem::new(ItemType::Note, "n"), "tester")
                .unwrap();
        }
        assert_eq!(count(&store, "tasks"), 18);

        assert!(store.delete_workspace(&doomed.id, "tester").unwrap());

        assert_eq!(count(&store, "workspaces"), 1);
        assert_eq!(count(&store, "boards"), 1);
        assert_eq!(count(&store, "columns"), 3);
        assert_eq!(count(&store, "tasks"), 0);
        assert_eq!(count(&store, "workspace_items"), 0);
        assert!(store.get_board(&kept_board.id).unwrap().is_some());
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_buy_milk_scenario() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        let names: Vec<String> = store
            .list_columns(&board.id)
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["To Do", "In Progress", "Done"]);

        let task = store
            .create_task(&board.column_ids[0], NewTask::new("buy milk"), "tester")
            .unwrap();
        assert!(!task.completed);
        assert_eq!(task.percent_complete, 0);

        let done = store
            .move_task(&task.id, &board.column_ids[0], &board.column_ids[2], 0, 0, "tester")
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.percent_complete, 100);

        assert!(store.delete_board(&board.id, "tester").unwrap());
        assert!(store.get_workspace(&ws.id).unwrap().unwrap().board_ids.is_empty());
        assert!(store.list_boards(&ws.id).unwrap().is_empty());
        assert!(store.get_task(&task.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_column_removes_tasks_and_renumbers() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        let task = store
            .create_task(&board.column_ids[1], NewTask::new("t"), "tester")
            .unwrap();

        assert!(store.delete_column(&board.column_ids[1], "tester").unwrap());
        assert!(store.get_task(&task.id).unwrap().is_none());
        let columns = store.list_columns(&board.id).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].name, "Done");
        assert_eq!(columns[1].position, 1);
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_delete_task_detaches_from_column_and_items() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();
        let item = store
            .create_item(&board.id, NewItem::new(ItemType::File, "roadmap.pdf"), "tester")
            .unwrap();
        store.link_item(&item.id, &task.id, "tester").unwrap();

        assert!(store.delete_task(&task.id, "tester").unwrap());
        assert!(store.get_column(&board.column_ids[0]).unwrap().unwrap().task_ids.is_empty());
        assert!(store.get_item(&item.id).unwrap().unwrap().linked_task_ids.is_empty());
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_delete_item_detaches_from_tasks() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();
        let item = store
            .create_item(&board.id, NewItem::new(ItemType::Note, "n"), "tester")
            .unwrap();
        store.link_item(&item.id, &task.id, "tester").unwrap();

        assert!(store.delete_item(&item.id, "tester").unwrap());
        assert!(store.get_task(&task.id).unwrap().unwrap().linked_documents.is_empty());
        assert!(store.list_items(&board.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_ids_return_false_without_notifying() {
        let mut store = Store::open_memory().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let _sub = store.subscribe({
            let hits = Arc::clone(&hits);
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(!store.delete_workspace("ws_nope", "tester").unwrap());
        assert!(!store.delete_board("board_nope", "tester").unwrap());
        assert!(!store.delete_column("col_nope", "tester").unwrap());
        assert!(!store.delete_task("task_nope", "tester").unwrap());
        assert!(!store.delete_item("item_nope", "tester").unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_referential_symmetry_after_mixed_operations() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        let cols = board.column_ids.clone();
        let mut tasks = Vec::new();
        for i in 0..6 {
            tasks.push(
                store
                    .create_task(&cols[i % 3], NewTask::new(format!("t{i}")), "tester")
                    .unwrap(),
            );
        }
        store.move_task(&tasks[0].id, &cols[0], &cols[2], 0, 0, "tester").unwrap();
        store.move_task(&tasks[1].id, &cols[1], &cols[0], 0, 99, "tester").unwrap();
        store.delete_task(&tasks[2].id, "tester").unwrap();
        store.move_task(&tasks[3].id, &cols[0], &cols[1], 5, 1, "tester").unwrap();
        store.delete_column(&cols[1], "tester").unwrap();

        let contents = store.contents().unwrap();
        for column in &contents.columns {
            let members = contents
                .tasks
                .iter()
                .filter(|t| t.column_id == column.id)
                .count();
            assert_eq!(column.task_ids.len(), members);
        }
        assert!(store.verify_integrity().unwrap().is_empty());
    }
}
