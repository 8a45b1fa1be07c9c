//! Workspace model: the root of ownership (a "group" in the UI).

use serde::{Deserialize, Serialize};

/// A workspace owning an ordered list of boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique identifier (`ws_...`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Owned boards, in display order
    #[serde(default)]
    pub board_ids: Vec<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Workspace {
    /// Create a new, empty workspace.
    pub fn new(name: String, description: String) -> Self {
        let now = super::now_ms();
        Self {
            id: super::new_id("ws"),
            name,
            description,
            board_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a workspace. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}
