//! SQLite storage implementation.
//!
//! [`Store`] owns the connection, the list-query caches, the analytics memo
//! and the change bus. Every write goes through [`Store::mutate`], which
//! runs the closure in one IMMEDIATE transaction and, only after commit,
//! invalidates the cache keys the closure touched and notifies subscribers
//! once.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{Connection, Transaction};

use super::cache::{CacheKey, ListCaches};
use super::documents::{self, Document, insert_new, load, load_all, load_ordered, put};
use super::events::{Event, EventType, get_events, insert_event};
use super::integrity::{self, IntegrityViolation, StoreContents};
use super::schema::apply_schema;
use crate::analytics::AnalyticsMemo;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::{
    Board, BoardUpdate, Column, ColumnUpdate, Comment, DEFAULT_COLUMNS, ItemUpdate, NewItem,
    NewTask, Task, TaskUpdate, Workspace, WorkspaceItem, WorkspaceUpdate, new_id, now_ms,
};
use crate::notify::{ChangeBus, ChangeEvent, Subscription};
use crate::status::{self, ColumnStatus};
use crate::validate;

/// Name of the workspace seeded on first run.
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";
/// Name of the board seeded on first run.
pub const DEFAULT_BOARD_NAME: &str = "Getting Started";
/// Content of the sample task seeded on first run.
pub const SAMPLE_TASK_CONTENT: &str = "Welcome to Boardkeep! Move me to Done";

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures to record audit events and to collect what
/// the transaction wrote, so the store can invalidate exactly those cache
/// keys once the transaction commits.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
    /// Tables written so far.
    pub tables: BTreeSet<&'static str>,
    /// List queries whose results the transaction changed.
    pub cache_keys: BTreeSet<CacheKey>,
    /// Tasks written or deleted (analytics memo eviction).
    pub tasks: BTreeSet<String>,
    /// A whole table was rewritten; drop every cache.
    pub reset_caches: bool,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
            tables: BTreeSet::new(),
            cache_keys: BTreeSet::new(),
            tasks: BTreeSet::new(),
            reset_caches: false,
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Note that `doc` was written or deleted.
    pub fn touch<D: Document>(&mut self, doc: &D) {
        self.tables.insert(D::TABLE);
        self.cache_keys.insert(doc.cache_key());
        self.cache_keys.extend(doc.child_cache_keys());
        if D::TABLE == Task::TABLE {
            self.tasks.insert(doc.id().to_string());
        }
    }

    /// Note that `table` was rewritten wholesale.
    pub fn touch_table(&mut self, table: &'static str) {
        self.tables.insert(table);
        self.reset_caches = true;
    }

    /// True once anything has been written.
    #[must_use]
    pub fn has_writes(&self) -> bool {
        !self.tables.is_empty()
    }
}

/// SQLite-backed entity store.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    cache: RefCell<ListCaches>,
    analytics: RefCell<AnalyticsMemo>,
    bus: ChangeBus,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open a database at the given path with default settings.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, &StoreConfig::default())
    }

    /// Open a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_config(path: &Path, config: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mut store = Self::from_connection(conn, config)?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Open an in-memory database (tests, and the fallback after a failed sync).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        Self::open_memory_with_config(&StoreConfig::default())
    }

    /// Open an in-memory database with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory_with_config(config: &StoreConfig) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, config)
    }

    fn from_connection(conn: Connection, config: &StoreConfig) -> Result<Self> {
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            path: None,
            cache: RefCell::new(ListCaches::new(config.cache_ttl)),
            analytics: RefCell::new(AnalyticsMemo::default()),
            bus: ChangeBus::new(),
        })
    }

    /// Database file, or `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Wait for the persistence layer to be readable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database fails its integrity check.
    pub fn sync(&self) -> Result<()> {
        let check: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if check != "ok" {
            return Err(Error::Other(format!("database check failed: {check}")));
        }
        Ok(())
    }

    /// The bus that carries one event per committed write transaction.
    #[must_use]
    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Shorthand for `self.bus().subscribe(callback)`.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(callback)
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    /// 5. Invalidates touched cache keys and analytics entries
    /// 6. Notifies subscribers once, if anything was written
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = match f(&tx, &mut ctx) {
            Ok(result) => result,
            Err(err) => {
                if matches!(err, Error::Database(_)) {
                    tracing::warn!(op, error = %err, "transaction rolled back");
                } else {
                    tracing::debug!(op, error = %err, "mutation rejected");
                }
                return Err(err);
            }
        };

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;

        self.after_commit(&ctx);
        Ok(result)
    }

    fn after_commit(&mut self, ctx: &MutationContext) {
        if !ctx.has_writes() {
            return;
        }

        let caches = self.cache.get_mut();
        let memo = self.analytics.get_mut();
        if ctx.reset_caches {
            caches.clear();
            memo.clear();
        } else {
            for key in &ctx.cache_keys {
                caches.invalidate(key);
            }
            for task_id in &ctx.tasks {
                memo.evict(task_id);
            }
        }

        tracing::debug!(op = %ctx.op_name, tables = ?ctx.tables, "committed");

        self.bus.emit(&ChangeEvent {
            op: ctx.op_name.clone(),
            actor: ctx.actor.clone(),
            tables: ctx.tables.clone(),
            committed_at: now_ms(),
        });
    }

    pub(crate) fn analytics_memo(&self) -> &RefCell<AnalyticsMemo> {
        &self.analytics
    }

    // ==================
    // Bootstrap
    // ==================

    /// True if every entity table is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn is_empty(&self) -> Result<bool> {
        tables_empty(&self.conn)
    }

    /// Seed the first-run content: every table empty and no audit history.
    ///
    /// A store the user emptied by deleting everything is left empty.
    /// Returns true if anything was seeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the seeding transaction fails.
    pub fn bootstrap_defaults(&mut self, actor: &str) -> Result<bool> {
        let seeded = self.mutate("bootstrap_defaults", actor, |tx, ctx| {
            if !is_first_run(tx)? {
                return Ok(false);
            }
            let ws = create_workspace_tx(tx, ctx, DEFAULT_WORKSPACE_NAME, "")?;
            let board = create_board_tx(
                tx,
                ctx,
                &ws.id,
                DEFAULT_BOARD_NAME,
                "A first board to try things out",
            )?;
            let todo = board
                .column_ids
                .first()
                .ok_or_else(|| Error::Other("default board has no columns".into()))?;
            create_task_tx(tx, ctx, todo, NewTask::new(SAMPLE_TASK_CONTENT))?;
            ctx.record_event("workspace", &ws.id, EventType::DefaultsSeeded);
            Ok(true)
        })?;
        if seeded {
            tracing::info!("seeded default workspace and board");
        }
        Ok(seeded)
    }

    // ==================
    // Workspace Operations
    // ==================

    /// Create a new workspace.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for an empty name, or an error if the insert fails.
    pub fn create_workspace(&mut self, name: &str, description: &str, actor: &str) -> Result<Workspace> {
        let name = validate::require_text("name", name)?;
        self.mutate("create_workspace", actor, |tx, ctx| {
            create_workspace_tx(tx, ctx, &name, description.trim())
        })
    }

    /// Get a workspace by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_workspace(&self, id: &str) -> Result<Option<Workspace>> {
        load(&self.conn, id)
    }

    /// List all workspaces, oldest first. Served from the query cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_workspaces(&self) -> Result<Arc<Vec<Workspace>>> {
        self.cache
            .borrow_mut()
            .workspaces
            .get_or_try_insert_with("", || load_all(&self.conn))
    }

    /// Update a workspace's name and/or description.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceNotFound` if the workspace doesn't exist.
    pub fn update_workspace(&mut self, id: &str, update: WorkspaceUpdate, actor: &str) -> Result<Workspace> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate::require_text("name", n))
            .transpose()?;
        self.mutate("update_workspace", actor, |tx, ctx| {
            let mut ws = require_workspace(tx, id)?;
            let old_name = ws.name.clone();
            if let Some(name) = name {
                ws.name = name;
            }
            if let Some(description) = update.description {
                ws.description = description.trim().to_string();
            }
            ws.updated_at = now_ms();
            put(tx, ctx, &ws)?;
            ctx.record_change(
                "workspace",
                &ws.id,
                EventType::WorkspaceUpdated,
                Some(old_name),
                Some(ws.name.clone()),
            );
            Ok(ws)
        })
    }

    // ==================
    // Board Operations
    // ==================

    /// Create a board under a workspace, seeded with the default columns.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceNotFound` if the workspace doesn't exist.
    pub fn create_board(
        &mut self,
        workspace_id: &str,
        name: &str,
        description: &str,
        actor: &str,
    ) -> Result<Board> {
        let name = validate::require_text("name", name)?;
        self.mutate("create_board", actor, |tx, ctx| {
            create_board_tx(tx, ctx, workspace_id, &name, description.trim())
        })
    }

    /// Get a board by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_board(&self, id: &str) -> Result<Option<Board>> {
        load(&self.conn, id)
    }

    /// List a workspace's boards in display order. An unknown workspace
    /// yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_boards(&self, workspace_id: &str) -> Result<Arc<Vec<Board>>> {
        self.cache
            .borrow_mut()
            .boards
            .get_or_try_insert_with(workspace_id, || {
                match load::<Workspace>(&self.conn, workspace_id)? {
                    Some(ws) => load_ordered(&self.conn, &ws.id, &ws.board_ids),
                    None => Ok(Vec::new()),
                }
            })
    }

    /// Update a board's name and/or description.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` if the board doesn't exist.
    pub fn update_board(&mut self, id: &str, update: BoardUpdate, actor: &str) -> Result<Board> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate::require_text("name", n))
            .transpose()?;
        self.mutate("update_board", actor, |tx, ctx| {
            let mut board = require_board(tx, id)?;
            let old_name = board.name.clone();
            if let Some(name) = name {
                board.name = name;
            }
            if let Some(description) = update.description {
                board.description = description.trim().to_string();
            }
            board.updated_at = now_ms();
            put(tx, ctx, &board)?;
            ctx.record_change(
                "board",
                &board.id,
                EventType::BoardUpdated,
                Some(old_name),
                Some(board.name.clone()),
            );
            Ok(board)
        })
    }

    // ==================
    // Column Operations
    // ==================

    /// Create a column, inserted at `position` (appended when absent or out
    /// of range). Sibling positions are renumbered to match list order.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` if the board doesn't exist.
    pub fn create_column(
        &mut self,
        board_id: &str,
        name: &str,
        position: Option<usize>,
        actor: &str,
    ) -> Result<Column> {
        let name = validate::require_text("name", name)?;
        self.mutate("create_column", actor, |tx, ctx| {
            create_column_tx(tx, ctx, board_id, &name, position)
        })
    }

    /// Get a column by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_column(&self, id: &str) -> Result<Option<Column>> {
        load(&self.conn, id)
    }

    /// List a board's columns in position order. An unknown board yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_columns(&self, board_id: &str) -> Result<Arc<Vec<Column>>> {
        self.cache
            .borrow_mut()
            .columns
            .get_or_try_insert_with(board_id, || match load::<Board>(&self.conn, board_id)? {
                Some(board) => load_ordered(&self.conn, &board.id, &board.column_ids),
                None => Ok(Vec::new()),
            })
    }

    /// Rename a column.
    ///
    /// When the new name classifies differently, member tasks take on the
    /// new status as if they had just entered the column.
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` if the column doesn't exist.
    pub fn update_column(&mut self, id: &str, update: ColumnUpdate, actor: &str) -> Result<Column> {
        let name = update
            .name
            .as_deref()
            .map(|n| validate::require_text("name", n))
            .transpose()?;
        self.mutate("update_column", actor, |tx, ctx| {
            let mut column = require_column(tx, id)?;
            let Some(name) = name else {
                return Ok(column);
            };
            let old_name = std::mem::replace(&mut column.name, name);
            let old_status = status::classify(&old_name);
            let new_status = status::classify(&column.name);
            let now = now_ms();
            column.updated_at = now;
            put(tx, ctx, &column)?;

            if old_status != new_status {
                for task_id in &column.task_ids {
                    if let Some(mut task) = load::<Task>(tx, task_id)? {
                        status::apply_status(&mut task, new_status);
                        task.updated_at = now;
                        put(tx, ctx, &task)?;
                    }
                }
            }

            ctx.record_change(
                "column",
                &column.id,
                EventType::ColumnUpdated,
                Some(old_name),
                Some(column.name.clone()),
            );
            Ok(column)
        })
    }

    /// Reorder a board's columns. `ordered_ids` must be a permutation of the
    /// board's current column list.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` or `Validation` when the ids don't match.
    pub fn reorder_columns(&mut self, board_id: &str, ordered_ids: &[String], actor: &str) -> Result<Board> {
        self.mutate("reorder_columns", actor, |tx, ctx| {
            let mut board = require_board(tx, board_id)?;
            let current: BTreeSet<&str> = board.column_ids.iter().map(String::as_str).collect();
            let proposed: BTreeSet<&str> = ordered_ids.iter().map(String::as_str).collect();
            if ordered_ids.len() != board.column_ids.len() || current != proposed {
                return Err(Error::Validation(format!(
                    "column order must list each of the board's {} columns exactly once",
                    board.column_ids.len()
                )));
            }
            board.column_ids = ordered_ids.to_vec();
            board.updated_at = now_ms();
            renumber_columns(tx, ctx, &board)?;
            put(tx, ctx, &board)?;
            ctx.record_event("board", &board.id, EventType::ColumnsReordered);
            Ok(board)
        })
    }

    // ==================
    // Task Operations
    // ==================

    /// Create a task at the end of a column. Status is inferred from the
    /// column name.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for empty content or `ColumnNotFound`.
    pub fn create_task(&mut self, column_id: &str, draft: NewTask, actor: &str) -> Result<Task> {
        let draft = validate_new_task(draft)?;
        self.mutate("create_task", actor, |tx, ctx| {
            create_task_tx(tx, ctx, column_id, draft)
        })
    }

    /// Get a task by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        load(&self.conn, id)
    }

    /// List a column's tasks in display order. An unknown column yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tasks(&self, column_id: &str) -> Result<Arc<Vec<Task>>> {
        self.cache
            .borrow_mut()
            .tasks
            .get_or_try_insert_with(column_id, || match load::<Column>(&self.conn, column_id)? {
                Some(column) => load_ordered(&self.conn, &column.id, &column.task_ids),
                None => Ok(Vec::new()),
            })
    }

    /// All tasks on a board, column by column.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn list_board_tasks(&self, board_id: &str) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for column in self.list_columns(board_id)?.iter() {
            tasks.extend(self.list_tasks(&column.id)?.iter().cloned());
        }
        Ok(tasks)
    }

    /// Apply a partial update to a task.
    ///
    /// A task sitting in a done column stays completed at 100% whatever the
    /// update says.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` or a validation error.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate, actor: &str) -> Result<Task> {
        let update = validate_task_update(update)?;
        self.mutate("update_task", actor, |tx, ctx| {
            let mut task = require_task(tx, id)?;
            let before = task.percent_complete;

            if let Some(content) = update.content {
                task.content = content;
            }
            if let Some(description) = update.description {
                task.description = description;
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(due_date) = update.due_date {
                task.due_date = due_date;
            }
            if let Some(labels) = update.labels {
                task.labels = labels;
            }
            if let Some(assignee) = update.assignee {
                task.assignee = assignee;
            }
            if let Some(percent) = update.percent_complete {
                task.percent_complete = percent;
            }
            if let Some(completed) = update.completed {
                task.completed = completed;
                if completed && update.percent_complete.is_none() {
                    task.percent_complete = 100;
                }
            }

            if let Some(column) = load::<Column>(tx, &task.column_id)? {
                if status::classify(&column.name) == ColumnStatus::Done {
                    status::apply_status(&mut task, ColumnStatus::Done);
                }
            }

            task.updated_at = now_ms();
            put(tx, ctx, &task)?;
            ctx.record_change(
                "task",
                &task.id,
                EventType::TaskUpdated,
                Some(before.to_string()),
                Some(task.percent_complete.to_string()),
            );
            Ok(task)
        })
    }

    /// Append a comment to a task.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` or `RequiredField` for empty text.
    pub fn add_comment(&mut self, task_id: &str, author: &str, text: &str, actor: &str) -> Result<Comment> {
        let text = validate::require_text("text", text)?;
        let author = validate::require_text("author", author)?;
        self.mutate("add_comment", actor, |tx, ctx| {
            let mut task = require_task(tx, task_id)?;
            let now = now_ms();
            let comment = Comment {
                id: new_id("cmt"),
                author,
                text,
                created_at: now,
            };
            task.comments.push(comment.clone());
            task.updated_at = now;
            put(tx, ctx, &task)?;
            ctx.record_event("task", &task.id, EventType::TaskCommented);
            Ok(comment)
        })
    }

    // ==================
    // Workspace Item Operations
    // ==================

    /// Attach a note, link or file reference to a board.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` or `RequiredField` for empty content.
    pub fn create_item(&mut self, board_id: &str, draft: NewItem, actor: &str) -> Result<WorkspaceItem> {
        let content = validate::require_text("content", &draft.content)?;
        let draft = NewItem { content, ..draft };
        self.mutate("create_item", actor, |tx, ctx| {
            let board = require_board(tx, board_id)?;
            let item = WorkspaceItem::new(board.id, draft);
            insert_new(tx, ctx, &item)?;
            ctx.record_event("item", &item.id, EventType::ItemCreated);
            Ok(item)
        })
    }

    /// Get a workspace item by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_item(&self, id: &str) -> Result<Option<WorkspaceItem>> {
        load(&self.conn, id)
    }

    /// List a board's workspace items, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_items(&self, board_id: &str) -> Result<Arc<Vec<WorkspaceItem>>> {
        self.cache
            .borrow_mut()
            .items
            .get_or_try_insert_with(board_id, || documents::load_by_parent(&self.conn, board_id))
    }

    /// Update an item's content and merge its metadata.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `RequiredField`.
    pub fn update_item(&mut self, id: &str, update: ItemUpdate, actor: &str) -> Result<WorkspaceItem> {
        let content = update
            .content
            .as_deref()
            .map(|c| validate::require_text("content", c))
            .transpose()?;
        self.mutate("update_item", actor, |tx, ctx| {
            let mut item = require_item(tx, id)?;
            if let Some(content) = content {
                item.content = content;
            }
            for (key, value) in update.metadata {
                if value.is_empty() {
                    item.metadata.remove(&key);
                } else {
                    item.metadata.insert(key, value);
                }
            }
            item.updated_at = now_ms();
            put(tx, ctx, &item)?;
            ctx.record_event("item", &item.id, EventType::ItemUpdated);
            Ok(item)
        })
    }

    /// Link an item and a task in both directions. Returns false if they
    /// were already linked.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `TaskNotFound`.
    pub fn link_item(&mut self, item_id: &str, task_id: &str, actor: &str) -> Result<bool> {
        self.mutate("link_item", actor, |tx, ctx| {
            let mut item = require_item(tx, item_id)?;
            let mut task = require_task(tx, task_id)?;
            let added = item.linked_task_ids.insert(task.id.clone());
            let mirrored = task.linked_documents.insert(item.id.clone());
            if !added && !mirrored {
                return Ok(false);
            }
            let now = now_ms();
            item.updated_at = now;
            task.updated_at = now;
            put(tx, ctx, &item)?;
            put(tx, ctx, &task)?;
            ctx.record_change("item", &item.id, EventType::ItemLinked, None, Some(task.id.clone()));
            Ok(true)
        })
    }

    /// Remove the link between an item and a task. Returns false if they
    /// were not linked.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `TaskNotFound`.
    pub fn unlink_item(&mut self, item_id: &str, task_id: &str, actor: &str) -> Result<bool> {
        self.mutate("unlink_item", actor, |tx, ctx| {
            let mut item = require_item(tx, item_id)?;
            let mut task = require_task(tx, task_id)?;
            let removed = item.linked_task_ids.remove(&task.id);
            let mirrored = task.linked_documents.remove(&item.id);
            if !removed && !mirrored {
                return Ok(false);
            }
            let now = now_ms();
            item.updated_at = now;
            task.updated_at = now;
            put(tx, ctx, &item)?;
            put(tx, ctx, &task)?;
            ctx.record_change("item", &item.id, EventType::ItemUnlinked, Some(task.id.clone()), None);
            Ok(true)
        })
    }

    // ==================
    // Whole-store Operations
    // ==================

    /// Every row of every entity table.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn contents(&self) -> Result<StoreContents> {
        Ok(StoreContents {
            workspaces: load_all(&self.conn)?,
            boards: load_all(&self.conn)?,
            columns: load_all(&self.conn)?,
            tasks: load_all(&self.conn)?,
            workspace_items: load_all(&self.conn)?,
        })
    }

    /// Report every broken ownership or membership invariant.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the tables fails.
    pub fn verify_integrity(&self) -> Result<Vec<IntegrityViolation>> {
        Ok(integrity::check_contents(&self.contents()?))
    }

    /// Audit events for an entity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_events(&self, entity_type: &str, entity_id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
        Ok(get_events(&self.conn, entity_type, entity_id, limit)?)
    }
}

// ==================
// Transaction-scoped helpers
// ==================

fn position_of(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn tables_empty(conn: &Connection) -> Result<bool> {
    Ok(documents::count::<Workspace>(conn)? == 0
        && documents::count::<Board>(conn)? == 0
        && documents::count::<Column>(conn)? == 0
        && documents::count::<Task>(conn)? == 0
        && documents::count::<WorkspaceItem>(conn)? == 0)
}

fn is_first_run(conn: &Connection) -> Result<bool> {
    let has_history: bool = conn.query_row("SELECT EXISTS(SELECT 1 FROM events)", [], |row| row.get(0))?;
    Ok(!has_history && tables_empty(conn)?)
}

pub(crate) fn require_workspace(conn: &Connection, id: &str) -> Result<Workspace> {
    load(conn, id)?.ok_or_else(|| Error::WorkspaceNotFound { id: id.to_string() })
}

pub(crate) fn require_board(conn: &Connection, id: &str) -> Result<Board> {
    load(conn, id)?.ok_or_else(|| Error::BoardNotFound { id: id.to_string() })
}

pub(crate) fn require_column(conn: &Connection, id: &str) -> Result<Column> {
    load(conn, id)?.ok_or_else(|| Error::ColumnNotFound { id: id.to_string() })
}

pub(crate) fn require_task(conn: &Connection, id: &str) -> Result<Task> {
    load(conn, id)?.ok_or_else(|| Error::TaskNotFound { id: id.to_string() })
}

pub(crate) fn require_item(conn: &Connection, id: &str) -> Result<WorkspaceItem> {
    load(conn, id)?.ok_or_else(|| Error::ItemNotFound { id: id.to_string() })
}

pub(crate) fn create_workspace_tx(
    tx: &Connection,
    ctx: &mut MutationContext,
    name: &str,
    description: &str,
) -> Result<Workspace> {
    let ws = Workspace::new(name.to_string(), description.to_string());
    insert_new(tx, ctx, &ws)?;
    ctx.record_event("workspace", &ws.id, EventType::WorkspaceCreated);
    Ok(ws)
}

pub(crate) fn create_board_tx(
    tx: &Connection,
    ctx: &mut MutationContext,
    workspace_id: &str,
    name: &str,
    description: &str,
) -> Result<Board> {
    let mut ws = require_workspace(tx, workspace_id)?;
    let mut board = Board::new(ws.id.clone(), name.to_string(), description.to_string());

    for (position, column_name) in (0_u32..).zip(DEFAULT_COLUMNS) {
        let column = Column::new(board.id.clone(), column_name.to_string(), position);
        board.column_ids.push(column.id.clone());
        insert_new(tx, ctx, &column)?;
    }
    insert_new(tx, ctx, &board)?;

    ws.board_ids.push(board.id.clone());
    ws.updated_at = board.created_at;
    put(tx, ctx, &ws)?;

    ctx.record_event("board", &board.id, EventType::BoardCreated);
    Ok(board)
}

pub(crate) fn create_column_tx(
    tx: &Connection,
    ctx: &mut MutationContext,
    board_id: &str,
    name: &str,
    position: Option<usize>,
) -> Result<Column> {
    let mut board = require_board(tx, board_id)?;
    let index = position.map_or(board.column_ids.len(), |p| p.min(board.column_ids.len()));
    let column = Column::new(board.id.clone(), name.to_string(), position_of(index));
    board.column_ids.insert(index, column.id.clone());
    board.updated_at = column.created_at;

    insert_new(tx, ctx, &column)?;
    renumber_columns(tx, ctx, &board)?;
    put(tx, ctx, &board)?;

    ctx.record_event("column", &column.id, EventType::ColumnCreated);
    Ok(column)
}

/// Rewrite sibling `position`s so they match the board's column order.
pub(crate) fn renumber_columns(tx: &Connection, ctx: &mut MutationContext, board: &Board) -> Result<()> {
    for (index, column_id) in board.column_ids.iter().enumerate() {
        if let Some(mut column) = load::<Column>(tx, column_id)? {
            let position = position_of(index);
            if column.position != position {
                column.position = position;
                column.updated_at = now_ms();
                put(tx, ctx, &column)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn create_task_tx(
    tx: &Connection,
    ctx: &mut MutationContext,
    column_id: &str,
    draft: NewTask,
) -> Result<Task> {
    let mut column = require_column(tx, column_id)?;
    let mut task = Task::new(column.id.clone(), draft);
    status::apply_status(&mut task, status::classify(&column.name));

    column.task_ids.push(task.id.clone());
    column.updated_at = task.created_at;

    insert_new(tx, ctx, &task)?;
    put(tx, ctx, &column)?;

    ctx.record_event("task", &task.id, EventType::TaskCreated);
    Ok(task)
}

fn validate_new_task(draft: NewTask) -> Result<NewTask> {
    Ok(NewTask {
        content: validate::require_text("content", &draft.content)?,
        description: draft.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        labels: validate::normalize_labels(&draft.labels),
        assignee: draft.assignee.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
        ..draft
    })
}

fn validate_task_update(update: TaskUpdate) -> Result<TaskUpdate> {
    Ok(TaskUpdate {
        content: update
            .content
            .as_deref()
            .map(|c| validate::require_text("content", c))
            .transpose()?,
        percent_complete: update.percent_complete.map(validate::validate_percent).transpose()?,
        labels: update.labels.map(validate::normalize_labels),
        ..update
    })
}

/// Replace every table with `contents` inside the caller's transaction.
pub(crate) fn replace_contents_tx(
    tx: &Connection,
    ctx: &mut MutationContext,
    contents: &StoreContents,
) -> Result<()> {
    documents::clear::<WorkspaceItem>(tx, ctx)?;
    documents::clear::<Task>(tx, ctx)?;
    documents::clear::<Column>(tx, ctx)?;
    documents::clear::<Board>(tx, ctx)?;
    documents::clear::<Workspace>(tx, ctx)?;

    for ws in &contents.workspaces {
        insert_new(tx, ctx, ws)?;
    }
    for board in &contents.boards {
        insert_new(tx, ctx, board)?;
    }
    for column in &contents.columns {
        insert_new(tx, ctx, column)?;
    }
    for task in &contents.tasks {
        insert_new(tx, ctx, task)?;
    }
    for item in &contents.workspace_items {
        insert_new(tx, ctx, item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemType, Priority};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with_board() -> (Store, Workspace, Board) {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let board = store.create_board(&ws.id, "B", "", "tester").unwrap();
        (store, ws, board)
    }

    #[test]
    fn test_open_memory() {
        let store = Store::open_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert!(store.sync().is_ok());
        assert!(store.path().is_none());
    }

    #[test]
    fn test_board_seeds_default_columns() {
        let (store, ws, board) = store_with_board();
        let columns = store.list_columns(&board.id).unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, DEFAULT_COLUMNS);
        let positions: Vec<u32> = columns.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let ws = store.get_workspace(&ws.id).unwrap().unwrap();
        assert_eq!(ws.board_ids, vec![board.id.clone()]);
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_create_board_under_missing_workspace_fails() {
        let mut store = Store::open_memory().unwrap();
        let err = store.create_board("ws_missing", "B", "", "tester").unwrap_err();
        assert!(matches!(err, Error::WorkspaceNotFound { .. }));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_empty_name_rejected_before_write() {
        let mut store = Store::open_memory().unwrap();
        let err = store.create_workspace("   ", "", "tester").unwrap_err();
        assert!(matches!(err, Error::RequiredField { field: "name" }));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_task_created_in_todo_and_done_columns() {
        let (mut store, _ws, board) = store_with_board();
        let columns = store.list_columns(&board.id).unwrap();

        let todo = store
            .create_task(&columns[0].id, NewTask::new("buy milk"), "tester")
            .unwrap();
        assert!(!todo.completed);
        assert_eq!(todo.percent_complete, 0);
        assert_eq!(todo.column_status, ColumnStatus::Todo);

        let done = store
            .create_task(&columns[2].id, NewTask::new("already done"), "tester")
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.percent_complete, 100);

        let listed = store.list_tasks(&columns[0].id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, todo.id);
    }

    #[test]
    fn test_create_task_rejects_empty_content() {
        let (mut store, _ws, board) = store_with_board();
        let column = &store.list_columns(&board.id).unwrap()[0];
        let err = store
            .create_task(&column.id, NewTask::new("  "), "tester")
            .unwrap_err();
        assert!(matches!(err, Error::RequiredField { field: "content" }));
        assert!(store.list_tasks(&column.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_column_at_position_renumbers() {
        let (mut store, _ws, board) = store_with_board();
        let review = store
            .create_column(&board.id, "Review", Some(2), "tester")
            .unwrap();
        assert_eq!(review.position, 2);
        let columns = store.list_columns(&board.id).unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["To Do", "In Progress", "Review", "Done"]);
        assert_eq!(columns[3].position, 3);

        let appended = store
            .create_column(&board.id, "Archive", Some(99), "tester")
            .unwrap();
        assert_eq!(appended.position, 4);
    }

    #[test]
    fn test_reorder_columns_requires_permutation() {
        let (mut store, _ws, board) = store_with_board();
        let mut ids = board.column_ids.clone();
        ids.reverse();
        let reordered = store.reorder_columns(&board.id, &ids, "tester").unwrap();
        assert_eq!(reordered.column_ids, ids);
        let columns = store.list_columns(&board.id).unwrap();
        assert_eq!(columns[0].name, "Done");
        assert_eq!(columns[0].position, 0);

        let err = store
            .reorder_columns(&board.id, &ids[..2], "tester")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let dup = vec![ids[0].clone(), ids[0].clone(), ids[1].clone()];
        assert!(store.reorder_columns(&board.id, &dup, "tester").is_err());
    }

    #[test]
    fn test_rename_column_to_done_completes_members() {
        let (mut store, _ws, board) = store_with_board();
        let review = store.create_column(&board.id, "Review", None, "tester").unwrap();
        let task = store
            .create_task(&review.id, NewTask::new("check"), "tester")
            .unwrap();
        assert_eq!(task.column_status, ColumnStatus::Other);

        store
            .update_column(&review.id, ColumnUpdate { name: Some(" shipped ".into()) }, "tester")
            .unwrap();
        let task = store.get_task(&task.id).unwrap().unwrap();
        assert!(task.completed);
        assert_eq!(task.percent_complete, 100);
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_update_task_fields_and_done_is_sticky() {
        let (mut store, _ws, board) = store_with_board();
        let done_col = board.column_ids[2].clone();
        let task = store
            .create_task(&done_col, NewTask::new("t").with_labels(&["a", " A ", "b"]), "tester")
            .unwrap();
        assert_eq!(task.labels, vec!["a".to_string(), "b".to_string()]);

        let updated = store
            .update_task(
                &task.id,
                TaskUpdate {
                    content: Some("renamed".into()),
                    priority: Some(Priority::High),
                    completed: Some(false),
                    percent_complete: Some(10),
                    due_date: Some(Some(1_000)),
                    ..TaskUpdate::default()
                },
                "tester",
            )
            .unwrap();
        assert_eq!(updated.content, "renamed");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.due_date, Some(1_000));
        assert!(updated.completed);
        assert_eq!(updated.percent_complete, 100);

        let err = store
            .update_task(
                &task.id,
                TaskUpdate {
                    percent_complete: Some(101),
                    ..TaskUpdate::default()
                },
                "tester",
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(matches!(
            store.update_task("task_missing", TaskUpdate::default(), "tester"),
            Err(Error::TaskNotFound { .. })
        ));
    }

    #[test]
    fn test_comments_are_appended() {
        let (mut store, _ws, board) = store_with_board();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();
        store.add_comment(&task.id, "ana", "first", "tester").unwrap();
        store.add_comment(&task.id, "ana", "second", "tester").unwrap();
        let task = store.get_task(&task.id).unwrap().unwrap();
        let texts: Vec<&str> = task.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(store.add_comment(&task.id, "ana", " ", "tester").is_err());
    }

    #[test]
    fn test_item_links_are_bidirectional() {
        let (mut store, _ws, board) = store_with_board();
        let task = store
            .create_task(&board.column_ids[0], NewTask::new("t"), "tester")
            .unwrap();
        let item = store
            .create_item(
                &board.id,
                NewItem::new(ItemType::Link, "https://example.com").with_meta("title", "Example"),
                "tester",
            )
            .unwrap();

        assert!(store.link_item(&item.id, &task.id, "tester").unwrap());
        assert!(!store.link_item(&item.id, &task.id, "tester").unwrap());
        let task_after = store.get_task(&task.id).unwrap().unwrap();
        let item_after = store.get_item(&item.id).unwrap().unwrap();
        assert!(task_after.linked_documents.contains(&item.id));
        assert!(item_after.linked_task_ids.contains(&task.id));
        assert!(store.verify_integrity().unwrap().is_empty());

        assert!(store.unlink_item(&item.id, &task.id, "tester").unwrap());
        assert!(!store.unlink_item(&item.id, &task.id, "tester").unwrap());
        assert!(store.get_task(&task.id).unwrap().unwrap().linked_documents.is_empty());
    }

    #[test]
    fn test_update_item_merges_metadata() {
        let (mut store, _ws, board) = store_with_board();
        let item = store
            .create_item(
                &board.id,
                NewItem::new(ItemType::Note, "n").with_meta("a", "1").with_meta("b", "2"),
                "tester",
            )
            .unwrap();
        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("a".to_string(), String::new());
        metadata.insert("c".to_string(), "3".to_string());
        let updated = store
            .update_item(&item.id, ItemUpdate { content: None, metadata }, "tester")
            .unwrap();
        assert_eq!(updated.metadata.len(), 2);
        assert_eq!(updated.metadata.get("c").map(String::as_str), Some("3"));
        assert!(!updated.metadata.contains_key("a"));
        assert_eq!(store.list_items(&board.id).unwrap().len(), 1);
    }

    #[test]
    fn test_list_boards_cache_is_keyed_by_workspace() {
        let mut store = Store::open_memory().unwrap();
        let w1 = store.create_workspace("W1", "", "tester").unwrap();
        let w2 = store.create_workspace("W2", "", "tester").unwrap();
        store.create_board(&w1.id, "B1", "", "tester").unwrap();

        let first = store.list_boards(&w1.id).unwrap();
        store.create_board(&w2.id, "Other", "", "tester").unwrap();
        let second = store.list_boards(&w1.id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        store.create_board(&w1.id, "B2", "", "tester").unwrap();
        let third = store.list_boards(&w1.id).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 2);
    }

    #[test]
    fn test_update_invalidates_parent_list() {
        let (mut store, ws, board) = store_with_board();
        let before = store.list_boards(&ws.id).unwrap();
        store
            .update_board(
                &board.id,
                BoardUpdate {
                    name: Some("Renamed".into()),
                    description: None,
                },
                "tester",
            )
            .unwrap();
        let after = store.list_boards(&ws.id).unwrap();
        assert_eq!(before[0].name, "B");
        assert_eq!(after[0].name, "Renamed");
    }

    #[test]
    fn test_notification_fires_once_per_transaction() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("W", "", "tester").unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let _sub = store.subscribe({
            let seen = Arc::clone(&seen);
            move |event| seen.lock().unwrap().push(event.clone())
        });

        // Board + workspace + three columns, one transaction.
        store.create_board(&ws.id, "B", "", "tester").unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].op, "create_board");
        assert!(seen[0].tables.contains("columns"));
        assert!(seen[0].tables.contains("workspaces"));
    }

    #[test]
    fn test_failed_mutation_rolls_back_and_is_silent() {
        let mut store = Store::open_memory().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let _sub = store.subscribe({
            let hits = Arc::clone(&hits);
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        let result: Result<()> = store.mutate("doomed", "tester", |tx, ctx| {
            create_workspace_tx(tx, ctx, "half", "")?;
            Err(Error::Other("boom".into()))
        });
        assert!(result.is_err());
        assert!(store.is_empty().unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bootstrap_seeds_once() {
        let mut store = Store::open_memory().unwrap();
        assert!(store.bootstrap_defaults("tester").unwrap());
        assert!(!store.bootstrap_defaults("tester").unwrap());

        let workspaces = store.list_workspaces().unwrap();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].name, DEFAULT_WORKSPACE_NAME);
        let boards = store.list_boards(&workspaces[0].id).unwrap();
        assert_eq!(boards[0].name, DEFAULT_BOARD_NAME);
        let tasks = store.list_board_tasks(&boards[0].id).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].column_id, boards[0].column_ids[0]);
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_bootstrap_skips_emptied_store() {
        let mut store = Store::open_memory().unwrap();
        let ws = store.create_workspace("Temp", "", "tester").unwrap();
        assert!(store.delete_workspace(&ws.id, "tester").unwrap());
        assert!(store.is_empty().unwrap());

        assert!(!store.bootstrap_defaults("tester").unwrap());
        assert!(store.list_workspaces().unwrap().is_empty());
    }

    #[test]
    fn test_events_recorded_with_mutation() {
        let (store, ws, board) = store_with_board();
        let events = store.get_events("board", &board.id, None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::BoardCreated);
        assert_eq!(events[0].actor, "tester");
        assert_eq!(store.get_events("workspace", &ws.id, None).unwrap().len(), 1);
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bk.db");
        let ws_id = {
            let mut store = Store::open(&path).unwrap();
            store.create_workspace("Saved", "", "tester").unwrap().id
        };
        let store = Store::open(&path).unwrap();
        assert_eq!(store.get_workspace(&ws_id).unwrap().unwrap().name, "Saved");
        assert_eq!(store.path(), Some(path.as_path()));
    }
}
