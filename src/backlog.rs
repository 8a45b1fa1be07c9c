//! Stale-task detection and the periodic backlog sweep.
//!
//! A task is stale when it is open, has seen no activity for the threshold,
//! and sits in a column that is neither a backlog lane nor classified done.
//! The sweep moves stale tasks into their board's backlog column through the
//! regular move engine, one transaction per task, releasing the store lock
//! between batches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::{Column, Task, now_ms};
use crate::status::{self, ColumnStatus};
use crate::storage::documents::{load, load_all};
use crate::storage::moves::{MoveRequest, move_task_tx};
use crate::storage::sqlite::{MutationContext, create_column_tx, require_board};
use crate::storage::Store;

/// Name given to backlog columns the sweep creates.
pub const BACKLOG_COLUMN_NAME: &str = "Backlog";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// A stale task and the column it currently sits in.
#[derive(Debug, Clone, Serialize)]
pub struct StaleTask {
    pub task: Task,
    pub column: Column,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Tasks found stale when the sweep started
    pub candidates: usize,
    /// Ids of tasks moved to a backlog column
    pub moved: Vec<String>,
    /// Candidates that changed or vanished before their turn
    pub skipped: usize,
    pub backlog_columns_created: usize,
    pub batches: usize,
}

fn cutoff_ms(threshold_days: u32, now: i64) -> i64 {
    now - i64::from(threshold_days) * DAY_MS
}

fn is_stale(task: &Task, column: &Column, cutoff: i64) -> bool {
    !task.completed
        && task.last_activity() < cutoff
        && !status::is_backlog(&column.name)
        && status::classify(&column.name) != ColumnStatus::Done
}

impl Store {
    /// Open tasks idle for more than `threshold_days`, oldest activity first.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn find_stale_tasks(&self, threshold_days: u32) -> Result<Vec<StaleTask>> {
        self.find_stale_tasks_at(threshold_days, now_ms())
    }

    /// [`Store::find_stale_tasks`] evaluated as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn find_stale_tasks_at(&self, threshold_days: u32, now: i64) -> Result<Vec<StaleTask>> {
        let cutoff = cutoff_ms(threshold_days, now);
        let columns: HashMap<String, Column> = load_all::<Column>(self.conn())?
            .into_iter()
            .map(|column| (column.id.clone(), column))
            .collect();

        let mut stale: Vec<StaleTask> = load_all::<Task>(self.conn())?
            .into_iter()
            .filter_map(|task| {
                let column = columns.get(&task.column_id)?;
                is_stale(&task, column, cutoff).then(|| StaleTask {
                    column: column.clone(),
                    task,
                })
            })
            .collect();
        stale.sort_by(|a, b| {
            a.task
                .last_activity()
                .cmp(&b.task.last_activity())
                .then_with(|| a.task.id.cmp(&b.task.id))
        });
        Ok(stale)
    }
}

/// Find the board's backlog column, creating one at index 0 if absent.
fn ensure_backlog_column(
    tx: &Connection,
    ctx: &mut MutationContext,
    board_id: &str,
) -> Result<(Column, bool)> {
    let board = require_board(tx, board_id)?;
    for column_id in &board.column_ids {
        if let Some(column) = load::<Column>(tx, column_id)? {
            if status::is_backlog(&column.name) {
                return Ok((column, false));
            }
        }
    }
    let column = create_column_tx(tx, ctx, board_id, BACKLOG_COLUMN_NAME, Some(0))?;
    Ok((column, true))
}

enum SweepStep {
    Moved { created_backlog: bool },
    Skipped,
}

fn sweep_one(
    store: &mut Store,
    candidate: &StaleTask,
    cutoff: i64,
    actor: &str,
    now: i64,
) -> Result<SweepStep> {
    store.mutate("backlog_sweep", actor, |tx, ctx| {
        let Some(task) = load::<Task>(tx, &candidate.task.id)? else {
            return Ok(SweepStep::Skipped);
        };
        let Some(column) = load::<Column>(tx, &task.column_id)? else {
            return Ok(SweepStep::Skipped);
        };
        if !is_stale(&task, &column, cutoff) {
            return Ok(SweepStep::Skipped);
        }

        let (backlog, created_backlog) = ensure_backlog_column(tx, ctx, &column.board_id)?;
        let source_index = column
            .task_ids
            .iter()
            .position(|id| *id == task.id)
            .unwrap_or_default();
        move_task_tx(
            tx,
            ctx,
            &MoveRequest {
                task_id: &task.id,
                source_column_id: &column.id,
                dest_column_id: &backlog.id,
                source_index,
                dest_index: usize::MAX,
                now,
            },
        )?;
        Ok(SweepStep::Moved { created_backlog })
    })
}

/// Move every stale task into its board's backlog column.
///
/// Each move is its own transaction. The store lock is released and the
/// task yields after every `batch_size` candidates, so other users of the
/// store interleave with a long sweep.
///
/// # Errors
///
/// Returns the first failing query or move. Moves committed before the
/// failure stay committed.
pub async fn sweep_stale_tasks(
    store: &Arc<Mutex<Store>>,
    threshold_days: u32,
    batch_size: usize,
    actor: &str,
) -> Result<SweepReport> {
    sweep_stale_tasks_at(store, threshold_days, batch_size, actor, now_ms()).await
}

/// [`sweep_stale_tasks`] evaluated as of `now`.
///
/// # Errors
///
/// See [`sweep_stale_tasks`].
pub async fn sweep_stale_tasks_at(
    store: &Arc<Mutex<Store>>,
    threshold_days: u32,
    batch_size: usize,
    actor: &str,
    now: i64,
) -> Result<SweepReport> {
    let cutoff = cutoff_ms(threshold_days, now);
    let candidates = store.lock().await.find_stale_tasks_at(threshold_days, now)?;

    let mut report = SweepReport {
        candidates: candidates.len(),
        ..SweepReport::default()
    };

    for batch in candidates.chunks(batch_size.max(1)) {
        {
            let mut guard = store.lock().await;
            for candidate in batch {
                match sweep_one(&mut guard, candidate, cutoff, actor, now)? {
                    SweepStep::Moved { created_backlog } => {
                        report.moved.push(candidate.task.id.clone());
                        if created_backlog {
                            report.backlog_columns_created += 1;
                        }
                    }
                    SweepStep::Skipped => report.skipped += 1,
                }
            }
        }
        report.batches += 1;
        tokio::task::yield_now().await;
    }

    tracing::info!(
        candidates = report.candidates,
        moved = report.moved.len(),
        skipped = report.skipped,
        "backlog sweep finished"
    );
    Ok(report)
}

/// Settings for [`BacklogSweeper`].
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
    pub threshold_days: u32,
    pub batch_size: usize,
    pub actor: String,
}

impl SweepConfig {
    #[must_use]
    pub fn from_store_config(config: &StoreConfig, actor: &str) -> Self {
        Self {
            interval: config.sweep_interval,
            threshold_days: config.stale_threshold_days,
            batch_size: config.sweep_batch_size,
            actor: actor.to_string(),
        }
    }
}

/// Runs [`sweep_stale_tasks`] on a fixed interval.
pub struct BacklogSweeper;

impl BacklogSweeper {
    /// Start sweeping in the background. The first sweep runs immediately.
    ///
    /// Dropping the returned handle cancels future runs like
    /// [`SweepHandle::cancel`].
    #[must_use]
    pub fn spawn(store: Arc<Mutex<Store>>, config: SweepConfig) -> SweepHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut runs = 0_usize;

            loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                match sweep_stale_tasks(
                    &store,
                    config.threshold_days,
                    config.batch_size,
                    &config.actor,
                )
                .await
                {
                    Ok(_) => runs += 1,
                    Err(err) => tracing::warn!(error = %err, "backlog sweep failed"),
                }
            }

            tracing::debug!(runs, "backlog sweeper stopped");
            runs
        });

        SweepHandle { cancel_tx, task }
    }
}

/// Handle to a running [`BacklogSweeper`].
#[derive(Debug)]
pub struct SweepHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<usize>,
}

impl SweepHandle {
    /// Stop scheduling sweeps. A sweep already running completes.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Cancel and wait for the sweeper to stop. Returns the number of
    /// sweeps that completed.
    ///
    /// # Errors
    ///
    /// Returns `Other` if the sweeper task panicked.
    pub async fn shutdown(self) -> Result<usize> {
        self.cancel();
        self.task
            .await
            .map_err(|err| crate::error::Error::Other(format!("backlog sweeper failed: {err}")))
    }
}
