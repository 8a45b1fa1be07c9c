//! Board model.

use serde::{Deserialize, Serialize};

/// A kanban board owned by a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Unique identifier (`board_...`)
    pub id: String,

    /// Owning workspace
    pub workspace_id: String,

    /// Display name
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Owned columns, in display order
    #[serde(default)]
    pub column_ids: Vec<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Board {
    /// Create a new board with no columns. Default columns are seeded by the store.
    pub fn new(workspace_id: String, name: String, description: String) -> Self {
        let now = super::now_ms();
        Self {
            id: super::new_id("board"),
            workspace_id,
            name,
            description,
            column_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a board.
#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}
