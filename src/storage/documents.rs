//! Typed access to the entity document tables.
//!
//! Each entity is stored as a JSON document next to its id and parent id.
//! [`put`] and [`erase`] are the only write paths; both record the touched
//! table, cache key and (for tasks) task id on the [`MutationContext`], so
//! post-commit invalidation cannot miss a write.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::cache::CacheKey;
use super::sqlite::MutationContext;
use crate::error::Result;
use crate::model::{Board, Column, Task, Workspace, WorkspaceItem};

/// An entity persisted as a document row.
pub trait Document: Serialize + DeserializeOwned + Clone {
    /// Backing table
    const TABLE: &'static str;
    /// Name used in audit events
    const ENTITY: &'static str;
    /// Indexed parent-id column, if the entity has a parent
    const PARENT_COLUMN: Option<&'static str>;

    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
    fn created_at(&self) -> i64;
    fn updated_at(&self) -> i64;

    /// The list query this entity appears in.
    fn cache_key(&self) -> CacheKey;

    /// List queries built from this entity's own child-id lists.
    fn child_cache_keys(&self) -> Vec<CacheKey> {
        Vec::new()
    }
}

impl Document for Workspace {
    const TABLE: &'static str = "workspaces";
    const ENTITY: &'static str = "workspace";
    const PARENT_COLUMN: Option<&'static str> = None;

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        None
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn cache_key(&self) -> CacheKey {
        CacheKey::Workspaces
    }
    fn child_cache_keys(&self) -> Vec<CacheKey> {
        vec![CacheKey::Boards(self.id.clone())]
    }
}

impl Document for Board {
    const TABLE: &'static str = "boards";
    const ENTITY: &'static str = "board";
    const PARENT_COLUMN: Option<&'static str> = Some("workspace_id");

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.workspace_id)
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn cache_key(&self) -> CacheKey {
        CacheKey::Boards(self.workspace_id.clone())
    }
    fn child_cache_keys(&self) -> Vec<CacheKey> {
        vec![CacheKey::Columns(self.id.clone()), CacheKey::Items(self.id.clone())]
    }
}

impl Document for Column {
    const TABLE: &'static str = "columns";
    const ENTITY: &'static str = "column";
    const PARENT_COLUMN: Option<&'static str> = Some("board_id");

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.board_id)
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn cache_key(&self) -> CacheKey {
        CacheKey::Columns(self.board_id.clone())
    }
    fn child_cache_keys(&self) -> Vec<CacheKey> {
        vec![CacheKey::Tasks(self.id.clone())]
    }
}

impl Document for Task {
    const TABLE: &'static str = "tasks";
    const ENTITY: &'static str = "task";
    const PARENT_COLUMN: Option<&'static str> = Some("column_id");

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.column_id)
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn cache_key(&self) -> CacheKey {
        CacheKey::Tasks(self.column_id.clone())
    }
}

impl Document for WorkspaceItem {
    const TABLE: &'static str = "workspace_items";
    const ENTITY: &'static str = "item";
    const PARENT_COLUMN: Option<&'static str> = Some("board_id");

    fn id(&self) -> &str {
        &self.id
    }
    fn parent_id(&self) -> Option<&str> {
        Some(&self.board_id)
    }
    fn created_at(&self) -> i64 {
        self.created_at
    }
    fn updated_at(&self) -> i64 {
        self.updated_at
    }
    fn cache_key(&self) -> CacheKey {
        CacheKey::Items(self.board_id.clone())
    }
}

fn parse<D: Document>(data: &str) -> Result<D> {
    Ok(serde_json::from_str(data)?)
}

/// Load one document by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored document is malformed.
pub fn load<D: Document>(conn: &Connection, id: &str) -> Result<Option<D>> {
    let data: Option<String> = conn
        .query_row(
            &format!("SELECT data FROM {} WHERE id = ?1", D::TABLE),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    data.as_deref().map(parse).transpose()
}

/// Load every document whose parent column equals `parent_id`, in
/// insertion order. Use [`load_ordered`] when the parent's list order matters.
///
/// # Errors
///
/// Returns an error if the query fails or a stored document is malformed.
pub fn load_by_parent<D: Document>(conn: &Connection, parent_id: &str) -> Result<Vec<D>> {
    let Some(parent_column) = D::PARENT_COLUMN else {
        return load_all(conn);
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT data FROM {} WHERE {parent_column} = ?1 ORDER BY created_at, id",
        D::TABLE
    ))?;
    let rows = stmt
        .query_map([parent_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.iter().map(|data| parse(data)).collect()
}

/// Load the documents named by `ids`, in that order. Ids that do not
/// resolve are skipped.
///
/// # Errors
///
/// Returns an error if the query fails or a stored document is malformed.
pub fn load_ordered<D: Document>(conn: &Connection, parent_id: &str, ids: &[String]) -> Result<Vec<D>> {
    let mut by_id: HashMap<String, D> = load_by_parent::<D>(conn, parent_id)?
        .into_iter()
        .map(|doc| (doc.id().to_string(), doc))
        .collect();
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Load every document of a table, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored document is malformed.
pub fn load_all<D: Document>(conn: &Connection) -> Result<Vec<D>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT data FROM {} ORDER BY created_at, id",
        D::TABLE
    ))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.iter().map(|data| parse(data)).collect()
}

/// Number of rows in a table.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count<D: Document>(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", D::TABLE), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(n).unwrap_or_default())
}

/// Insert or replace a document.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn put<D: Document>(conn: &Connection, ctx: &mut MutationContext, doc: &D) -> Result<()> {
    let data = serde_json::to_string(doc)?;
    match (D::PARENT_COLUMN, doc.parent_id()) {
        (Some(parent_column), Some(parent_id)) => {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO {} (id, {parent_column}, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    D::TABLE
                ),
                rusqlite::params![doc.id(), parent_id, data, doc.created_at(), doc.updated_at()],
            )?;
        }
        _ => {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO {} (id, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    D::TABLE
                ),
                rusqlite::params![doc.id(), data, doc.created_at(), doc.updated_at()],
            )?;
        }
    }
    ctx.touch::<D>(doc);
    Ok(())
}

/// Insert a document that must not exist yet.
///
/// # Errors
///
/// Returns an error on a duplicate id or a failed write.
pub fn insert_new<D: Document>(conn: &Connection, ctx: &mut MutationContext, doc: &D) -> Result<()> {
    let data = serde_json::to_string(doc)?;
    match (D::PARENT_COLUMN, doc.parent_id()) {
        (Some(parent_column), Some(parent_id)) => {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, {parent_column}, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    D::TABLE
                ),
                rusqlite::params![doc.id(), parent_id, data, doc.created_at(), doc.updated_at()],
            )?;
        }
        _ => {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    D::TABLE
                ),
                rusqlite::params![doc.id(), data, doc.created_at(), doc.updated_at()],
            )?;
        }
    }
    ctx.touch::<D>(doc);
    Ok(())
}

/// Delete a document row. Returns false if no row had that id.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn erase<D: Document>(conn: &Connection, ctx: &mut MutationContext, doc: &D) -> Result<bool> {
    let removed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", D::TABLE), [doc.id()])?;
    if removed > 0 {
        ctx.touch::<D>(doc);
    }
    Ok(removed > 0)
}

/// Delete every row of a table.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn clear<D: Document>(conn: &Connection, ctx: &mut MutationContext) -> Result<usize> {
    let removed = conn.execute(&format!("DELETE FROM {}", D::TABLE), [])?;
    ctx.touch_table(D::TABLE);
    Ok(removed)
}
