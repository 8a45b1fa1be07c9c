//! Status inference from free-text column names.
//!
//! Column names are user-supplied, so lifecycle state is derived by matching
//! the trimmed, lowercased name against synonym sets. Classification is pure
//! and total: anything unrecognized is [`ColumnStatus::Other`].

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::model::Task;

/// Progress given to a task entering an in-progress column with no progress yet.
pub const IN_PROGRESS_START_PERCENT: u8 = 5;

static DONE_NAMES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["done", "completed", "complete", "finished", "closed", "shipped"]
        .into_iter()
        .collect()
});

static IN_PROGRESS_NAMES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["in progress", "in-progress", "doing", "working", "started", "wip", "active"]
        .into_iter()
        .collect()
});

static TODO_NAMES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["to do", "todo", "to-do", "backlog", "planned", "new", "open"]
        .into_iter()
        .collect()
});

/// Semantic lifecycle state of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Other,
}

impl ColumnStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ColumnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim, lowercase and collapse internal whitespace.
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify a column display name.
#[must_use]
pub fn classify(column_name: &str) -> ColumnStatus {
    let name = normalize(column_name);
    if DONE_NAMES.contains(name.as_str()) {
        ColumnStatus::Done
    } else if IN_PROGRESS_NAMES.contains(name.as_str()) {
        ColumnStatus::InProgress
    } else if TODO_NAMES.contains(name.as_str()) {
        ColumnStatus::Todo
    } else {
        ColumnStatus::Other
    }
}

/// True if the column is a backlog lane (the stale-task sweep target).
#[must_use]
pub fn is_backlog(column_name: &str) -> bool {
    normalize(column_name) == "backlog"
}

/// Apply the effects of entering a column with `status` to `task`.
///
/// Sets `column_status` and forces completion fields:
/// - `Done`: completed, 100%
/// - `InProgress`: 0% becomes [`IN_PROGRESS_START_PERCENT`] and not completed;
///   existing progress is kept
/// - `Todo`: not completed, 0%
/// - `Other`: completion fields untouched
pub fn apply_status(task: &mut Task, status: ColumnStatus) {
    task.column_status = status;
    match status {
        ColumnStatus::Done => {
            task.completed = true;
            task.percent_complete = 100;
        }
        ColumnStatus::InProgress => {
            if task.percent_complete == 0 {
                task.percent_complete = IN_PROGRESS_START_PERCENT;
                task.completed = false;
            }
        }
        ColumnStatus::Todo => {
            task.completed = false;
            task.percent_complete = 0;
        }
        ColumnStatus::Other => {}
    }
}
