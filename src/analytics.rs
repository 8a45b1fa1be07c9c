//! Read-only task and board statistics.
//!
//! Per-task figures are a pure function of the task document, so they are
//! memoized keyed by `(task id, updated_at)`: an entry whose timestamp no
//! longer matches the task is recomputed, never served. The store also
//! evicts entries for every task a transaction wrote.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::Result;
use crate::model::{Priority, Task};
use crate::status::ColumnStatus;
use crate::storage::Store;

/// Derived statistics for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAnalytics {
    pub task_id: String,
    /// Sum of closed column stays (milliseconds)
    pub total_dwell_ms: i64,
    /// `updated_at - created_at` for completed tasks
    pub cycle_time_ms: Option<i64>,
    /// Column id → milliseconds spent there before leaving
    pub per_column_ms: BTreeMap<String, i64>,
    /// Number of cross-column moves
    pub transition_count: usize,
    pub current_status: ColumnStatus,
}

/// Compute [`TaskAnalytics`] from a task document.
#[must_use]
pub fn compute_task_analytics(task: &Task) -> TaskAnalytics {
    let cycle_time_ms = (task.completed && task.updated_at >= task.created_at)
        .then(|| task.updated_at - task.created_at);
    TaskAnalytics {
        task_id: task.id.clone(),
        total_dwell_ms: task.time_in_columns.values().map(|ms| (*ms).max(0)).sum(),
        cycle_time_ms,
        per_column_ms: task.time_in_columns.clone(),
        transition_count: task.movement_history.len(),
        current_status: task.column_status,
    }
}

/// Memo of [`TaskAnalytics`] keyed by task id and the task's `updated_at`.
#[derive(Debug, Default)]
pub struct AnalyticsMemo {
    entries: HashMap<String, (i64, TaskAnalytics)>,
    hits: u64,
    misses: u64,
}

impl AnalyticsMemo {
    /// Return the memoized analytics for `task`, recomputing when the stored
    /// entry was taken at a different `updated_at`.
    pub fn get_or_compute(&mut self, task: &Task) -> TaskAnalytics {
        if let Some((stamp, analytics)) = self.entries.get(&task.id) {
            if *stamp == task.updated_at {
                self.hits += 1;
                return analytics.clone();
            }
        }
        self.misses += 1;
        let analytics = compute_task_analytics(task);
        self.entries
            .insert(task.id.clone(), (task.updated_at, analytics.clone()));
        analytics
    }

    pub fn evict(&mut self, task_id: &str) {
        self.entries.remove(task_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Task count for one column of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCount {
    pub column_id: String,
    pub name: String,
    pub tasks: usize,
}

/// Aggregate statistics for a board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardAnalytics {
    pub board_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Completed / total, 0 for an empty board
    pub completion_rate: f64,
    pub priority_counts: BTreeMap<Priority, usize>,
    pub column_counts: Vec<ColumnCount>,
    /// Open tasks due before the start of today (UTC)
    pub overdue_count: usize,
    /// Mean cycle time of completed tasks, 0 when there are none
    pub average_cycle_time_ms: f64,
    pub total_moves: usize,
}

/// Store-wide activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub tasks_created: usize,
    pub tasks_completed: usize,
    /// Recorded cross-column moves across every task
    pub total_moves: usize,
}

/// Start of the UTC day containing `now_ms`.
#[must_use]
pub fn start_of_day_ms(now_ms: i64) -> i64 {
    chrono::DateTime::from_timestamp_millis(now_ms)
        .and_then(|dt| dt.date_naive().and_hms_opt(0, 0, 0))
        .map_or(now_ms, |midnight| midnight.and_utc().timestamp_millis())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: i64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl Store {
    /// Analytics for one task, or `None` if the task doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the task lookup fails.
    pub fn task_analytics(&self, task_id: &str) -> Result<Option<TaskAnalytics>> {
        let Some(task) = self.get_task(task_id)? else {
            return Ok(None);
        };
        Ok(Some(self.analytics_memo().borrow_mut().get_or_compute(&task)))
    }

    /// `(hits, misses)` of the task analytics memo.
    #[must_use]
    pub fn analytics_memo_stats(&self) -> (u64, u64) {
        self.analytics_memo().borrow().stats()
    }

    /// Aggregate statistics for a board, or `None` if the board doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn board_analytics(&self, board_id: &str) -> Result<Option<BoardAnalytics>> {
        self.board_analytics_at(board_id, crate::model::now_ms())
    }

    /// [`Store::board_analytics`] evaluated as of `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn board_analytics_at(&self, board_id: &str, now_ms: i64) -> Result<Option<BoardAnalytics>> {
        if self.get_board(board_id)?.is_none() {
            return Ok(None);
        }
        let cutoff = start_of_day_ms(now_ms);

        let mut analytics = BoardAnalytics {
            board_id: board_id.to_string(),
            total_tasks: 0,
            completed_tasks: 0,
            completion_rate: 0.0,
            priority_counts: BTreeMap::new(),
            column_counts: Vec::new(),
            overdue_count: 0,
            average_cycle_time_ms: 0.0,
            total_moves: 0,
        };
        let mut cycle_total = 0_i64;
        let mut cycle_count = 0_usize;

        for column in self.list_columns(board_id)?.iter() {
            let tasks = self.list_tasks(&column.id)?;
            analytics.column_counts.push(ColumnCount {
                column_id: column.id.clone(),
                name: column.name.clone(),
                tasks: tasks.len(),
            });
            for task in tasks.iter() {
                analytics.total_tasks += 1;
                *analytics.priority_counts.entry(task.priority).or_default() += 1;
                if task.is_overdue(cutoff) {
                    analytics.overdue_count += 1;
                }
                let per_task = self.analytics_memo().borrow_mut().get_or_compute(task);
                analytics.total_moves += per_task.transition_count;
                if task.completed {
                    analytics.completed_tasks += 1;
                }
                if let Some(cycle) = per_task.cycle_time_ms {
                    cycle_total += cycle;
                    cycle_count += 1;
                }
            }
        }

        analytics.completion_rate = ratio(
            i64::try_from(analytics.completed_tasks).unwrap_or(i64::MAX),
            analytics.total_tasks,
        );
        analytics.average_cycle_time_ms = ratio(cycle_total, cycle_count);
        Ok(Some(analytics))
    }

    /// Store-wide counters. `total_moves` counts recorded moves.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn activity_stats(&self) -> Result<ActivityStats> {
        let tasks: Vec<Task> = crate::storage::documents::load_all(self.conn())?;
        Ok(ActivityStats {
            tasks_created: tasks.len(),
            tasks_completed: tasks.iter().filter(|t| t.completed).count(),
            total_moves: tasks.iter().map(|t| t.movement_history.len()).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, TaskUpdate};

    fn board_store() -> (Store, crate::model::Board) {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        (store, board)
    }

    #[test]
    fn test_compute_task_analytics() {
        let mut task = Task::new("c1".into(), NewTask::new("t"));
        task.created_at = 1_000;
        task.updated_at = 6_000;
        task.time_in_columns.insert("c0".into(), 1_500);
        task.time_in_columns.insert("c1".into(), 500);
        let open = compute_task_analytics(&task);
        assert_eq!(open.total_dwell_ms, 2_000);
        assert_eq!(open.cycle_time_ms, None);
        assert_eq!(open.transition_count, 0);

        task.completed = true;
        assert_eq!(compute_task_analytics(&task).cycle_time_ms, Some(5_000));
    }

    #[test]
    fn test_memo_keyed_by_updated_at() {
        let mut memo = AnalyticsMemo::default();
        let mut task = Task::new("c1".into(), NewTask::new("t"));
        memo.get_or_compute(&task);
        memo.get_or_compute(&task);
        assert_eq!(memo.stats(), (1, 1));

        task.updated_at += 1;
        task.time_in_columns.insert("c0".into(), 42);
        let fresh = memo.get_or_compute(&task);
        assert_eq!(fresh.total_dwell_ms, 42);
        assert_eq!(memo.stats(), (1, 2));
    }

    #[test]
    fn test_store_evicts_memo_on_write() {
        let (mut store, board) = board_store();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();
        store.task_analytics(&task.id).unwrap().unwrap();
        store.task_analytics(&task.id).unwrap().unwrap();
        assert_eq!(store.analytics_memo_stats(), (1, 1));

        store
            .update_task(
                &task.id,
                TaskUpdate {
                    content: Some("changed".into()),
                    ..TaskUpdate::default()
                },
                "tester",
            )
            .unwrap();
        store.task_analytics(&task.id).unwrap().unwrap();
        assert_eq!(store.analytics_memo_stats(), (1, 2));
        assert!(store.task_analytics("task_missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_board_reports_zero_rates() {
        let (store, board) = board_store();
        let analytics = store.board_analytics(&board.id).unwrap().unwrap();
        assert_eq!(analytics.total_tasks, 0);
        assert!(analytics.completion_rate.abs() < f64::EPSILON);
        assert!(!analytics.completion_rate.is_nan());
        assert!(analytics.average_cycle_time_ms.abs() < f64::EPSILON);
        assert_eq!(analytics.column_counts.len(), 3);
        assert!(store.board_analytics("board_missing").unwrap().is_none());
    }

    #[test]
    fn test_board_analytics_aggregates() {
        let (mut store, board) = board_store();
        let now = crate::model::now_ms();
        let day = 24 * 60 * 60 * 1000;
        store
            .create_task(
                &board.column_ids[0],
                NewTask::new("late").with_priority(Priority::High).with_due_date(now - 2 * day),
                "tester",
            )
            .unwrap();
        store
            .create_task(&board.column_ids[0], NewTask::new("later").with_due_date(now + day), "tester")
            .unwrap();
        store
            .create_task(
                &board.column_ids[2],
                NewTask::new("done late").with_due_date(now - 2 * day),
                "tester",
            )
            .unwrap();

        let analytics = store.board_analytics_at(&board.id, now).unwrap().unwrap();
        assert_eq!(analytics.total_tasks, 3);
        assert_eq!(analytics.completed_tasks, 1);
        assert!((analytics.completion_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(analytics.overdue_count, 1);
        assert_eq!(analytics.priority_counts.get(&Priority::High), Some(&1));
        assert_eq!(analytics.priority_counts.get(&Priority::Medium), Some(&2));
        assert_eq!(analytics.column_counts[0].tasks, 2);
        assert_eq!(analytics.column_counts[2].tasks, 1);
    }

    #[test]
    fn test_board_analytics_fresh_after_move() {
        let (mut store, board) = board_store();
        let (todo, done) = (&board.column_ids[0], &board.column_ids[2]);
        let task = store.create_task(todo, NewTask::new("t"), "tester").unwrap();
        let before = store.board_analytics(&board.id).unwrap().unwrap();
        assert_eq!(before.total_tasks, 1);
        assert_eq!(before.completed_tasks, 0);

        store.move_task(&task.id, todo, done, 0, 0, "tester").unwrap();

        let after = store.board_analytics(&board.id).unwrap().unwrap();
        assert_eq!(after.total_tasks, 1);
        assert_eq!(after.completed_tasks, 1);
        assert!((after.completion_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(after.column_counts[0].tasks, 0);
        assert_eq!(after.column_counts[2].tasks, 1);
        assert_eq!(after.total_moves, 1);
    }

    #[test]
    fn test_start_of_day() {
        // 2024-03-05T13:45:00Z
        let ts = 1_709_646_300_000;
        assert_eq!(start_of_day_ms(ts), 1_709_596_800_000);
    }

    #[test]
    fn test_activity_counts_real_moves() {
        let (mut store, board) = board_store();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();
        store
            .move_task(&task.id, &board.column_ids[0], &board.column_ids[1], 0, 0, "tester")
            .unwrap();
        store
            .move_task(&task.id, &board.column_ids[1], &board.column_ids[2], 0, 0, "tester")
            .unwrap();
        let stats = store.activity_stats().unwrap();
        assert_eq!(stats.tasks_created, 1);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.total_moves, 2);
    }
}
