//! Task moves between and within columns.
//!
//! A move rewrites the source and destination membership lists, the task's
//! column back-pointer, its inferred status and, for cross-column moves, its
//! dwell-time bookkeeping, all in one transaction.

use super::documents::{load, put};
use super::events::EventType;
use super::sqlite::{MutationContext, Store, require_task};
use crate::error::{ColumnRole, Error, Result};
use crate::model::{Column, Movement, Task, now_ms};
use crate::status;
use rusqlite::Connection;

impl Store {
    /// Move a task to `dest_index` of `dest_column_id`.
    ///
    /// `dest_index` is clamped to the destination list, so passing its
    /// length appends. `source_index` is a hint: when it does not point at
    /// the task, the task is located by id.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound`, `MoveColumnNotFound` naming the missing side,
    /// or `InvalidArgument` if the task is not in `source_column_id`.
    pub fn move_task(
        &mut self,
        task_id: &str,
        source_column_id: &str,
        dest_column_id: &str,
        source_index: usize,
        dest_index: usize,
        actor: &str,
    ) -> Result<Task> {
        self.move_task_at(
            task_id,
            source_column_id,
            dest_column_id,
            source_index,
            dest_index,
            actor,
            now_ms(),
        )
    }

    /// [`Store::move_task`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Store::move_task`].
    #[allow(clippy::too_many_arguments)]
    pub fn move_task_at(
        &mut self,
        task_id: &str,
        source_column_id: &str,
        dest_column_id: &str,
        source_index: usize,
        dest_index: usize,
        actor: &str,
        now: i64,
    ) -> Result<Task> {
        self.mutate("move_task", actor, |tx, ctx| {
            move_task_tx(
                tx,
                ctx,
                &MoveRequest {
                    task_id,
                    source_column_id,
                    dest_column_id,
                    source_index,
                    dest_index,
                    now,
                },
            )
        })
    }
}

pub(crate) struct MoveRequest<'a> {
    pub task_id: &'a str,
    pub source_column_id: &'a str,
    pub dest_column_id: &'a str,
    pub source_index: usize,
    pub dest_index: usize,
    pub now: i64,
}

fn require_move_column(conn: &Connection, id: &str, role: ColumnRole) -> Result<Column> {
    load(conn, id)?.ok_or_else(|| Error::MoveColumnNotFound {
        role,
        id: id.to_string(),
    })
}

/// Remove `task_id` from `ids`, preferring the slot at `hint`.
fn take_from(ids: &mut Vec<String>, task_id: &str, hint: usize) {
    if ids.get(hint).is_some_and(|id| id == task_id) {
        ids.remove(hint);
    } else {
        ids.retain(|id| id != task_id);
    }
}

pub(crate) fn move_task_tx(
    tx: &Connection,
    ctx: &mut MutationContext,
    req: &MoveRequest<'_>,
) -> Result<Task> {
    let mut task = require_task(tx, req.task_id)?;
    let mut source = require_move_column(tx, req.source_column_id, ColumnRole::Source)?;
    let mut dest = if req.dest_column_id == req.source_column_id {
        None
    } else {
        Some(require_move_column(tx, req.dest_column_id, ColumnRole::Destination)?)
    };

    if task.column_id != source.id {
        return Err(Error::InvalidArgument(format!(
            "task {} is in column {}, not {}",
            task.id, task.column_id, source.id
        )));
    }

    take_from(&mut source.task_ids, &task.id, req.source_index);
    source.updated_at = req.now;

    let target = dest.as_mut().unwrap_or(&mut source);
    let index = req.dest_index.min(target.task_ids.len());
    target.task_ids.insert(index, task.id.clone());
    target.updated_at = req.now;
    let target_name = target.name.clone();
    let target_id = target.id.clone();

    if target_id != source.id {
        let elapsed = (req.now - task.last_column_change).max(0);
        *task.time_in_columns.entry(source.id.clone()).or_default() += elapsed;
        task.last_column_change = req.now;
        task.movement_history.push(Movement {
            from_column_id: source.id.clone(),
            to_column_id: target_id.clone(),
            to_index: index,
            moved_at: req.now,
        });
    }

    task.column_id.clone_from(&target_id);
    status::apply_status(&mut task, status::classify(&target_name));
    task.updated_at = req.now;

    put(tx, ctx, &source)?;
    if let Some(dest) = &dest {
        put(tx, ctx, dest)?;
    }
    put(tx, ctx, &task)?;

    ctx.record_change(
        "task",
        &task.id,
        EventType::TaskMoved,
        Some(source.id.clone()),
        Some(target_id),
    );
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Board, NewTask};
    use crate::status::ColumnStatus;

    fn setup() -> (Store, Board, Task) {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("buy milk"), "tester")
            .unwrap();
        (store, board, task)
    }

    fn column_ids(store: &Store, id: &str) -> Vec<String> {
        store.get_column(id).unwrap().unwrap().task_ids
    }

    #[test]
    fn test_move_to_done_completes() {
        let (mut store, board, task) = setup();
        let moved = store
            .move_task(&task.id, &board.column_ids[0], &board.column_ids[2], 0, 0, "tester")
            .unwrap();
        assert!(moved.completed);
        assert_eq!(moved.percent_complete, 100);
        assert_eq!(moved.column_status, ColumnStatus::Done);
        assert!(column_ids(&store, &board.column_ids[0]).is_empty());
        assert_eq!(column_ids(&store, &board.column_ids[2]), vec![task.id.clone()]);
    }

    #[test]
    fn test_done_matching_ignores_case_and_whitespace() {
        let (mut store, board, task) = setup();
        let shouty = store
            .create_column(&board.id, "  DONE  ", None, "tester")
            .unwrap();
        let partial = store
            .update_task(
                &task.id,
                crate::model::TaskUpdate {
                    percent_complete: Some(30),
                    ..Default::default()
                },
                "tester",
            )
            .unwrap();
        assert_eq!(partial.percent_complete, 30);
        let moved = store
            .move_task(&task.id, &board.column_ids[0], &shouty.id, 0, 0, "tester")
            .unwrap();
        assert!(moved.completed);
        assert_eq!(moved.percent_complete, 100);
    }

    #[test]
    fn test_in_progress_bumps_fresh_task() {
        let (mut store, board, task) = setup();
        let moved = store
            .move_task(&task.id, &board.column_ids[0], &board.column_ids[1], 0, 0, "tester")
            .unwrap();
        assert_eq!(moved.percent_complete, status::IN_PROGRESS_START_PERCENT);
        assert!(!moved.completed);
    }

    #[test]
    fn test_move_and_back_restores_membership() {
        let (mut store, board, task) = setup();
        let (a, b) = (&board.column_ids[0], &board.column_ids[1]);
        store.move_task(&task.id, a, b, 0, 7, "tester").unwrap();
        let back = store.move_task(&task.id, b, a, 0, 0, "tester").unwrap();
        assert_eq!(&back.column_id, a);
        assert!(column_ids(&store, b).is_empty());
        assert_eq!(column_ids(&store, a), vec![task.id.clone()]);
        assert_eq!(back.movement_history.len(), 2);
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_dwell_time_accumulates_on_source() {
        let (mut store, board, task) = setup();
        let (a, b) = (&board.column_ids[0], &board.column_ids[1]);
        let t0 = task.last_column_change;
        let moved = store
            .move_task_at(&task.id, a, b, 0, 0, "tester", t0 + 5_000)
            .unwrap();
        assert_eq!(moved.time_in_columns.get(a.as_str()), Some(&5_000));
        assert_eq!(moved.last_column_change, t0 + 5_000);

        let back = store
            .move_task_at(&task.id, b, a, 0, 0, "tester", t0 + 8_000)
            .unwrap();
        assert_eq!(back.time_in_columns.get(b.as_str()), Some(&3_000));
        assert_eq!(back.time_in_columns.get(a.as_str()), Some(&5_000));
    }

    #[test]
    fn test_clock_skew_counts_as_zero() {
        let (mut store, board, task) = setup();
        let moved = store
            .move_task_at(
                &task.id,
                &board.column_ids[0],
                &board.column_ids[1],
                0,
                0,
                "tester",
                task.last_column_change - 10_000,
            )
            .unwrap();
        assert_eq!(moved.time_in_columns.get(board.column_ids[0].as_str()), Some(&0));
    }

    #[test]
    fn test_reorder_within_column() {
        let (mut store, board, first) = setup();
        let col = &board.column_ids[0];
        let second = store.create_task(col, NewTask::new("second"), "tester").unwrap();
        let third = store.create_task(col, NewTask::new("third"), "tester").unwrap();

        let moved = store.move_task(&third.id, col, col, 2, 0, "tester").unwrap();
        assert!(moved.movement_history.is_empty());
        assert!(moved.time_in_columns.is_empty());
        assert_eq!(
            column_ids(&store, col),
            vec![third.id.clone(), first.id.clone(), second.id.clone()]
        );
        let listed = store.list_tasks(col).unwrap();
        assert_eq!(listed[0].id, third.id);
    }

    #[test]
    fn test_move_errors_name_the_missing_side() {
        let (mut store, board, task) = setup();
        let a = &board.column_ids[0];
        match store.move_task(&task.id, "col_nope", a, 0, 0, "tester") {
            Err(Error::MoveColumnNotFound { role, .. }) => assert_eq!(role, ColumnRole::Source),
            other => panic!("expected source error, got {other:?}"),
        }
        match store.move_task(&task.id, a, "col_nope", 0, 0, "tester") {
            Err(Error::MoveColumnNotFound { role, .. }) => {
                assert_eq!(role, ColumnRole::Destination);
            }
            other => panic!("expected destination error, got {other:?}"),
        }
        assert!(matches!(
            store.move_task("task_nope", a, a, 0, 0, "tester"),
            Err(Error::TaskNotFound { .. })
        ));
        assert!(matches!(
            store.move_task(&task.id, &board.column_ids[1], a, 0, 0, "tester"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(column_ids(&store, a), vec![task.id.clone()]);
    }

    #[test]
    fn test_move_invalidates_both_task_lists() {
        let (mut store, board, task) = setup();
        let (a, b) = (&board.column_ids[0], &board.column_ids[2]);
        assert_eq!(store.list_tasks(a).unwrap().len(), 1);
        assert!(store.list_tasks(b).unwrap().is_empty());
        store.move_task(&task.id, a, b, 0, 0, "tester").unwrap();
        assert!(store.list_tasks(a).unwrap().is_empty());
        assert_eq!(store.list_tasks(b).unwrap().len(), 1);

        store.move_task(&task.id, b, a, 0, 0, "tester").unwrap();
        assert!(store.list_tasks(b).unwrap().is_empty());
        assert_eq!(store.list_tasks(a).unwrap()[0].id, task.id);
    }
}
