//! Referential integrity checks over a full copy of the store.
//!
//! Used by `Store::verify_integrity`, by `bk doctor`, and by import to reject
//! a snapshot before anything is replaced.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Board, Column, Task, Workspace, WorkspaceItem};
use crate::status::{self, ColumnStatus};

/// Every row of every entity table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContents {
    pub workspaces: Vec<Workspace>,
    pub boards: Vec<Board>,
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
    pub workspace_items: Vec<WorkspaceItem>,
}

impl StoreContents {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
            && self.boards.is_empty()
            && self.columns.is_empty()
            && self.tasks.is_empty()
            && self.workspace_items.is_empty()
    }

    /// Row count per table, in ownership order.
    #[must_use]
    pub fn counts(&self) -> [(&'static str, usize); 5] {
        [
            ("workspaces", self.workspaces.len()),
            ("boards", self.boards.len()),
            ("columns", self.columns.len()),
            ("tasks", self.tasks.len()),
            ("workspace_items", self.workspace_items.len()),
        ]
    }
}

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    pub entity: &'static str,
    pub id: String,
    pub problem: String,
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.entity, self.id, self.problem)
    }
}

struct Report(Vec<IntegrityViolation>);

impl Report {
    fn push(&mut self, entity: &'static str, id: &str, problem: String) {
        self.0.push(IntegrityViolation {
            entity,
            id: id.to_string(),
            problem,
        });
    }
}

fn index_by_id<'a, T>(
    report: &mut Report,
    entity: &'static str,
    rows: &'a [T],
    id_of: impl Fn(&T) -> &str,
) -> HashMap<&'a str, &'a T> {
    let mut by_id = HashMap::with_capacity(rows.len());
    for row in rows {
        if by_id.insert(id_of(row), row).is_some() {
            report.push(entity, id_of(row), "duplicate id".to_string());
        }
    }
    by_id
}

fn check_list(report: &mut Report, entity: &'static str, owner: &str, ids: &[String]) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            report.push(entity, owner, format!("lists {id} more than once"));
        }
    }
}

/// Check every ownership, membership and derived-status invariant.
#[must_use]
pub fn check_contents(contents: &StoreContents) -> Vec<IntegrityViolation> {
    let mut report = Report(Vec::new());

    let workspaces = index_by_id(&mut report, "workspace", &contents.workspaces, |w| &w.id);
    let boards = index_by_id(&mut report, "board", &contents.boards, |b| &b.id);
    let columns = index_by_id(&mut report, "column", &contents.columns, |c| &c.id);
    let tasks = index_by_id(&mut report, "task", &contents.tasks, |t| &t.id);
    let items = index_by_id(&mut report, "item", &contents.workspace_items, |i| &i.id);

    for ws in &contents.workspaces {
        check_list(&mut report, "workspace", &ws.id, &ws.board_ids);
        for board_id in &ws.board_ids {
            match boards.get(board_id.as_str()) {
                None => report.push("workspace", &ws.id, format!("lists missing board {board_id}")),
                Some(board) if board.workspace_id != ws.id => report.push(
                    "workspace",
                    &ws.id,
                    format!("lists board {board_id} owned by {}", board.workspace_id),
                ),
                Some(_) => {}
            }
        }
    }

    for board in &contents.boards {
        match workspaces.get(board.workspace_id.as_str()) {
            None => report.push("board", &board.id, format!("owner workspace {} missing", board.workspace_id)),
            Some(ws) if !ws.board_ids.contains(&board.id) => report.push(
                "board",
                &board.id,
                format!("not listed by workspace {}", board.workspace_id),
            ),
            Some(_) => {}
        }
        check_list(&mut report, "board", &board.id, &board.column_ids);
        for column_id in &board.column_ids {
            match columns.get(column_id.as_str()) {
                None => report.push("board", &board.id, format!("lists missing column {column_id}")),
                Some(column) if column.board_id != board.id => report.push(
                    "board",
                    &board.id,
                    format!("lists column {column_id} owned by {}", column.board_id),
                ),
                Some(_) => {}
            }
        }
    }

    let mut listed_in: HashMap<&str, usize> = HashMap::new();
    for column in &contents.columns {
        match boards.get(column.board_id.as_str()) {
            None => report.push("column", &column.id, format!("owner board {} missing", column.board_id)),
            Some(board) if !board.column_ids.contains(&column.id) => report.push(
                "column",
                &column.id,
                format!("not listed by board {}", column.board_id),
            ),
            Some(_) => {}
        }
        check_list(&mut report, "column", &column.id, &column.task_ids);
        for task_id in &column.task_ids {
            *listed_in.entry(task_id.as_str()).or_default() += 1;
            match tasks.get(task_id.as_str()) {
                None => report.push("column", &column.id, format!("lists missing task {task_id}")),
                Some(task) if task.column_id != column.id => report.push(
                    "column",
                    &column.id,
                    format!("lists task {task_id} whose column is {}", task.column_id),
                ),
                Some(_) => {}
            }
        }
    }

    for task in &contents.tasks {
        match columns.get(task.column_id.as_str()) {
            None => report.push("task", &task.id, format!("owner column {} missing", task.column_id)),
            Some(column) => {
                if !column.task_ids.contains(&task.id) {
                    report.push("task", &task.id, format!("not listed by column {}", column.id));
                }
                if status::classify(&column.name) == ColumnStatus::Done
                    && !(task.completed && task.percent_complete == 100)
                {
                    report.push(
                        "task",
                        &task.id,
                        "in a done column but not completed at 100%".to_string(),
                    );
                }
            }
        }
        if listed_in.get(task.id.as_str()).copied().unwrap_or_default() > 1 {
            report.push("task", &task.id, "listed by more than one column".to_string());
        }
        if task.percent_complete > 100 {
            report.push("task", &task.id, format!("percent_complete {} out of range", task.percent_complete));
        }
        for item_id in &task.linked_documents {
            if !items.get(item_id.as_str()).is_some_and(|item| item.linked_task_ids.contains(&task.id)) {
                report.push("task", &task.id, format!("link to item {item_id} is not mirrored"));
            }
        }
    }

    for item in &contents.workspace_items {
        if !boards.contains_key(item.board_id.as_str()) {
            report.push("item", &item.id, format!("owner board {} missing", item.board_id));
        }
        for task_id in &item.linked_task_ids {
            if !tasks.get(task_id.as_str()).is_some_and(|task| task.linked_documents.contains(&item.id)) {
                report.push("item", &item.id, format!("link to task {task_id} is not mirrored"));
            }
        }
    }

    report.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;

    fn tiny_board() -> StoreContents {
        let mut ws = Workspace::new("W".into(), String::new());
        let mut board = Board::new(ws.id.clone(), "B".into(), String::new());
        let mut column = Column::new(board.id.clone(), "To Do".into(), 0);
        let task = Task::new(column.id.clone(), NewTask::new("t"));
        ws.board_ids.push(board.id.clone());
        board.column_ids.push(column.id.clone());
        column.task_ids.push(task.id.clone());
        StoreContents {
            workspaces: vec![ws],
            boards: vec![board],
            columns: vec![column],
            tasks: vec![task],
            workspace_items: Vec::new(),
        }
    }

    #[test]
    fn test_consistent_contents_pass() {
        assert!(check_contents(&tiny_board()).is_empty());
        assert!(check_contents(&StoreContents::default()).is_empty());
    }

    #[test]
    fn test_orphan_task_is_reported() {
        let mut contents = tiny_board();
        contents.columns[0].task_ids.clear();
        let violations = check_contents(&contents);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entity, "task");
        assert!(violations[0].problem.contains("not listed"));
    }

    #[test]
    fn test_dangling_board_reference_is_reported() {
        let mut contents = tiny_board();
        contents.workspaces[0].board_ids.push("board_gone".into());
        let violations = check_contents(&contents);
        assert!(violations.iter().any(|v| v.problem.contains("board_gone")));
    }

    #[test]
    fn test_done_column_requires_completion() {
        let mut contents = tiny_board();
        contents.columns[0].name = "Done".into();
        let violations = check_contents(&contents);
        assert!(violations.iter().any(|v| v.problem.contains("done column")));
    }

    #[test]
    fn test_unmirrored_link_is_reported() {
        let mut contents = tiny_board();
        let item = WorkspaceItem::new(
            contents.boards[0].id.clone(),
            crate::model::NewItem::new(crate::model::ItemType::Note, "n"),
        );
        contents.tasks[0].linked_documents.insert(item.id.clone());
        contents.workspace_items.push(item);
        let violations = check_contents(&contents);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].problem.contains("not mirrored"));
    }
}
