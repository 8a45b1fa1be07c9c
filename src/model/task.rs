//! Task model: the atomic work item.
//!
//! `column_status`, `completed` and `percent_complete` are derived from the
//! column a task was last placed in (see [`crate::status`]). Comments and
//! movement history are append-only.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::status::ColumnStatus;

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Get the string representation for storage and output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validate::normalize_priority(s)
    }
}

/// A comment on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: i64,
}

/// One entry of a task's movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub from_column_id: String,
    pub to_column_id: String,
    pub to_index: usize,
    pub moved_at: i64,
}

/// A task within a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (`task_...`)
    pub id: String,

    /// Owning column
    pub column_id: String,

    /// Task text
    pub content: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Lifecycle state inferred from the column name at the last move
    pub column_status: ColumnStatus,

    pub completed: bool,

    /// 0..=100
    pub percent_complete: u8,

    #[serde(default)]
    pub priority: Priority,

    /// Due date (Unix milliseconds)
    pub due_date: Option<i64>,

    #[serde(default)]
    pub labels: Vec<String>,

    pub assignee: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,

    /// When the task last entered a different column
    pub last_column_change: i64,

    /// Column id → accumulated milliseconds spent there
    #[serde(default)]
    pub time_in_columns: BTreeMap<String, i64>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub movement_history: Vec<Movement>,

    /// Workspace items linked to this task
    #[serde(default)]
    pub linked_documents: BTreeSet<String>,
}

impl Task {
    /// Create a task in `column_id`. Status fields start at `todo` / 0% and
    /// are re-derived by the store from the column name.
    pub fn new(column_id: String, draft: NewTask) -> Self {
        let now = super::now_ms();
        Self {
            id: super::new_id("task"),
            column_id,
            content: draft.content,
            description: draft.description,
            column_status: ColumnStatus::Todo,
            completed: false,
            percent_complete: 0,
            priority: draft.priority,
            due_date: draft.due_date,
            labels: draft.labels,
            assignee: draft.assignee,
            created_at: now,
            updated_at: now,
            last_column_change: now,
            time_in_columns: BTreeMap::new(),
            comments: Vec::new(),
            movement_history: Vec::new(),
            linked_documents: BTreeSet::new(),
        }
    }

    /// `max(updated_at, created_at)`, the activity timestamp used by the
    /// stale-task sweep.
    #[must_use]
    pub fn last_activity(&self) -> i64 {
        self.updated_at.max(self.created_at)
    }

    /// True if the due date lies strictly before `cutoff` and the task is open.
    #[must_use]
    pub fn is_overdue(&self, cutoff: i64) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < cutoff)
    }
}

/// Fields for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub content: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<i64>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
}

impl NewTask {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_due_date(mut self, due_ms: i64) -> Self {
        self.due_date = Some(due_ms);
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }
}

/// Partial update for a task.
///
/// Double options distinguish "leave alone" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub content: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<i64>>,
    pub labels: Option<Vec<String>>,
    pub assignee: Option<Option<String>>,
    pub percent_complete: Option<u8>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    /// True if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.labels.is_none()
            && self.assignee.is_none()
            && self.percent_complete.is_none()
            && self.completed.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new(
            "col_1".to_string(),
            NewTask::new("buy milk").with_priority(Priority::High),
        );
        assert!(task.id.starts_with("task_"));
        assert_eq!(task.column_id, "col_1");
        assert_eq!(task.priority, Priority::High);
        assert!(!task.completed);
        assert_eq!(task.percent_complete, 0);
        assert_eq!(task.last_column_change, task.created_at);
        assert!(task.time_in_columns.is_empty());
    }

    #[test]
    fn test_overdue_requires_open_task() {
        let mut task = Task::new("col_1".to_string(), NewTask::new("x").with_due_date(1_000));
        assert!(task.is_overdue(2_000));
        assert!(!task.is_overdue(1_000));
        task.completed = true;
        assert!(!task.is_overdue(2_000));
    }

    #[test]
    fn test_priority_serde_lowercase() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"high\"");
        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }
}
