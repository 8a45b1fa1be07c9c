//! Data models for Boardkeep.
//!
//! Ownership runs Workspace → Board → Column → Task. Parent → child edges
//! are ordered id lists on the parent; child → parent edges are a single id
//! field on the child. Workspace items hang off a Board, outside the
//! Column/Task hierarchy.

pub mod board;
pub mod column;
pub mod item;
pub mod task;
pub mod workspace;

pub use board::{Board, BoardUpdate};
pub use column::{Column, ColumnUpdate, DEFAULT_COLUMNS};
pub use item::{ItemType, ItemUpdate, NewItem, WorkspaceItem};
pub use task::{Comment, Movement, NewTask, Priority, Task, TaskUpdate};
pub use workspace::{Workspace, WorkspaceUpdate};

/// Current time as Unix milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a prefixed entity id (e.g. `task_1f0c2ab4e9d3`).
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Append `id` to an ordered id list unless it is already present.
pub(crate) fn push_unique(ids: &mut Vec<String>, id: &str) -> bool {
    if ids.iter().any(|existing| existing == id) {
        return false;
    }
    ids.push(id.to_string());
    true
}

/// Remove every occurrence of `id` from an ordered id list.
pub(crate) fn remove_id(ids: &mut Vec<String>, id: &str) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_prefix_and_length() {
        let id = new_id("task");
        assert!(id.starts_with("task_"));
        assert_eq!(id.len(), "task_".len() + 12);
        assert_ne!(new_id("task"), new_id("task"));
    }

    #[test]
    fn test_membership_helpers() {
        let mut ids = vec!["a".to_string()];
        assert!(!push_unique(&mut ids, "a"));
        assert!(push_unique(&mut ids, "b"));
        assert!(remove_id(&mut ids, "a"));
        assert!(!remove_id(&mut ids, "a"));
        assert_eq!(ids, vec!["b".to_string()]);
    }
}
