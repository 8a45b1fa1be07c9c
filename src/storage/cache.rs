//! Time-boxed memoization of children-of-parent list queries.
//!
//! Entries are keyed by parent id. A read within the TTL returns the stored
//! `Arc` without touching SQLite; a read after expiry or after the key was
//! invalidated recomputes. The store invalidates exactly the keys a
//! transaction touched, after it commits, so unrelated parents stay hot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::model::{Board, Column, Task, Workspace, WorkspaceItem};

/// Default time a cached list stays valid.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Identifies one memoized list: which collection, and under which parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// All workspaces (the root list)
    Workspaces,
    /// Boards of a workspace
    Boards(String),
    /// Columns of a board
    Columns(String),
    /// Tasks of a column
    Tasks(String),
    /// Workspace items of a board
    Items(String),
}

struct CacheEntry<T> {
    stored_at: Instant,
    value: Arc<Vec<T>>,
}

/// A TTL cache of ordered lists keyed by parent id.
pub struct QueryCache<T> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> QueryCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Return the cached list for `key` if it is still within the TTL.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Vec<T>>> {
        self.entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Return the cached list, or compute, store and return it.
    ///
    /// # Errors
    ///
    /// Propagates the error from `compute`; nothing is stored in that case.
    pub fn get_or_try_insert_with<F>(&mut self, key: &str, compute: F) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce() -> Result<Vec<T>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = Arc::new(compute()?);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                value: Arc::clone(&value),
            },
        );
        Ok(value)
    }

    /// Drop the entry for `key`. Returns true if one was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One [`QueryCache`] per entity collection.
pub struct ListCaches {
    pub workspaces: QueryCache<Workspace>,
    pub boards: QueryCache<Board>,
    pub columns: QueryCache<Column>,
    pub tasks: QueryCache<Task>,
    pub items: QueryCache<WorkspaceItem>,
}

impl ListCaches {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            workspaces: QueryCache::new(ttl),
            boards: QueryCache::new(ttl),
            columns: QueryCache::new(ttl),
            tasks: QueryCache::new(ttl),
            items: QueryCache::new(ttl),
        }
    }

    pub fn invalidate(&mut self, key: &CacheKey) {
        match key {
            CacheKey::Workspaces => self.workspaces.invalidate(""),
            CacheKey::Boards(id) => self.boards.invalidate(id),
            CacheKey::Columns(id) => self.columns.invalidate(id),
            CacheKey::Tasks(id) => self.tasks.invalidate(id),
            CacheKey::Items(id) => self.items.invalidate(id),
        };
    }

    pub fn clear(&mut self) {
        self.workspaces.clear();
        self.boards.clear();
        self.columns.clear();
        self.tasks.clear();
        self.items.clear();
    }
}
