//! Column model.
//!
//! A column's display name is free text; its lifecycle meaning is derived by
//! [`crate::status::classify`], never stored as an enum on the column.

use serde::{Deserialize, Serialize};

/// Columns seeded on every new board, in position order.
///
/// Status inference recognizes each of these names, so the seed is part of
/// the store contract.
pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

/// An ordered lane of tasks within a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Unique identifier (`col_...`)
    pub id: String,

    /// Owning board
    pub board_id: String,

    /// Display name (drives status inference)
    pub name: String,

    /// Member tasks; this order is the user-visible task order
    #[serde(default)]
    pub task_ids: Vec<String>,

    /// Position among sibling columns
    pub position: u32,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Column {
    /// Create a new empty column.
    pub fn new(board_id: String, name: String, position: u32) -> Self {
        let now = super::now_ms();
        Self {
            id: super::new_id("col"),
            board_id,
            name,
            task_ids: Vec::new(),
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a column.
#[derive(Debug, Clone, Default)]
pub struct ColumnUpdate {
    pub name: Option<String>,
}
