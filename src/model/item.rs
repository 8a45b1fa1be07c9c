//! Workspace item model: notes, links and file references attached to a
//! board, outside the column/task hierarchy.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Kind of workspace item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Note,
    Link,
    File,
}

impl ItemType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Link => "link",
            Self::File => "file",
        }
    }

    /// Parse from string, falling back to `Note`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "link" | "url" => Self::Link,
            "file" | "attachment" => Self::File,
            _ => Self::Note,
        }
    }
}

/// A note, link or file reference owned by a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceItem {
    /// Unique identifier (`item_...`)
    pub id: String,

    /// Owning board
    pub board_id: String,

    pub item_type: ItemType,

    pub content: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Tasks this item is linked to (mirrors `Task::linked_documents`)
    #[serde(default)]
    pub linked_task_ids: BTreeSet<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl WorkspaceItem {
    pub fn new(board_id: String, draft: NewItem) -> Self {
        let now = super::now_ms();
        Self {
            id: super::new_id("item"),
            board_id,
            item_type: draft.item_type,
            content: draft.content,
            metadata: draft.metadata,
            linked_task_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields for creating a workspace item.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub item_type: ItemType,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl NewItem {
    pub fn new(item_type: ItemType, content: impl Into<String>) -> Self {
        Self {
            item_type,
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Partial update for a workspace item. Metadata entries are merged; an
/// empty value removes the key.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub content: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_parse() {
        assert_eq!(ItemType::parse("LINK"), ItemType::Link);
        assert_eq!(ItemType::parse("attachment"), ItemType::File);
        assert_eq!(ItemType::parse("whatever"), ItemType::Note);
    }
}
