//! Error types for Boardkeep.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 6=import/export, ...)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Lookups that probe for existence (`get_*`) return `Ok(None)` instead of
//! an error; the `*NotFound` variants are reserved for operations that need
//! the entity to exist (create under a parent, update, move).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Boardkeep operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    TransactionFailed,
    SyncTimeout,

    // Not Found (exit 3)
    WorkspaceNotFound,
    BoardNotFound,
    ColumnNotFound,
    TaskNotFound,
    ItemNotFound,

    // Validation (exit 4)
    ValidationFailed,
    InvalidPriority,
    InvalidArgument,
    RequiredField,

    // Import / export (exit 6)
    ImportFailed,
    ExportFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::SyncTimeout => "SYNC_TIMEOUT",
            Self::WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
            Self::BoardNotFound => "BOARD_NOT_FOUND",
            Self::ColumnNotFound => "COLUMN_NOT_FOUND",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidPriority => "INVALID_PRIORITY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::ImportFailed => "IMPORT_FAILED",
            Self::ExportFailed => "EXPORT_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::TransactionFailed
            | Self::SyncTimeout => 2,
            Self::WorkspaceNotFound
            | Self::BoardNotFound
            | Self::ColumnNotFound
            | Self::TaskNotFound
            | Self::ItemNotFound => 3,
            Self::ValidationFailed
            | Self::InvalidPriority
            | Self::InvalidArgument
            | Self::RequiredField => 4,
            Self::ImportFailed | Self::ExportFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::InvalidPriority
                | Self::InvalidArgument
                | Self::RequiredField
                | Self::TransactionFailed
                | Self::SyncTimeout
        )
    }
}

/// Which side of a move referenced a missing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Source,
    Destination,
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Boardkeep operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `bk init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Workspace not found: {id}")]
    WorkspaceNotFound { id: String },

    #[error("Board not found: {id}")]
    BoardNotFound { id: String },

    #[error("Column not found: {id}")]
    ColumnNotFound { id: String },

    #[error("Move {role} column not found: {id}")]
    MoveColumnNotFound { role: ColumnRole, id: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Workspace item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Required field missing: {field}")]
    RequiredField { field: &'static str },

    #[error("Invalid priority: {input}")]
    InvalidPriority {
        input: String,
        suggestion: Option<String>,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transaction failed: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Initial sync timed out after {timeout_ms}ms")]
    SyncTimeout { timeout_ms: u64 },

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::WorkspaceNotFound { .. } => ErrorCode::WorkspaceNotFound,
            Self::BoardNotFound { .. } => ErrorCode::BoardNotFound,
            Self::ColumnNotFound { .. } | Self::MoveColumnNotFound { .. } => {
                ErrorCode::ColumnNotFound
            }
            Self::TaskNotFound { .. } => ErrorCode::TaskNotFound,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::RequiredField { .. } => ErrorCode::RequiredField,
            Self::InvalidPriority { .. } => ErrorCode::InvalidPriority,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Database(_) => ErrorCode::TransactionFailed,
            Self::SyncTimeout { .. } => ErrorCode::SyncTimeout,
            Self::Import(_) => ErrorCode::ImportFailed,
            Self::Export(_) => ErrorCode::ExportFailed,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// True for the "referenced id is absent" family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.error_code().exit_code() == 3
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `bk init` to create the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::WorkspaceNotFound { id } => Some(format!(
                "No workspace with ID '{id}'. Use `bk workspace list` to see available workspaces."
            )),
            Self::BoardNotFound { id } => Some(format!(
                "No board with ID '{id}'. Use `bk board list <workspace-id>` to see boards."
            )),
            Self::ColumnNotFound { id } | Self::MoveColumnNotFound { id, .. } => Some(format!(
                "No column with ID '{id}'. Use `bk column list <board-id>` to see columns."
            )),
            Self::TaskNotFound { id } => Some(format!(
                "No task with ID '{id}'. Use `bk task list <column-id>` to see tasks."
            )),
            Self::ItemNotFound { id } => Some(format!(
                "No workspace item with ID '{id}'. Use `bk item list <board-id>` to see items."
            )),

            Self::InvalidPriority { suggestion, .. } => Some(match suggestion {
                Some(s) => format!("Did you mean '{s}'? Valid priorities: low, medium, high"),
                None => "Valid priorities: low, medium, high (synonyms: urgent, normal, minor)"
                    .to_string(),
            }),

            Self::RequiredField { field } => Some(format!("Provide a non-empty {field}.")),

            Self::SyncTimeout { .. } => Some(
                "Storage was not ready in time. \
                 Raise BK_SYNC_TIMEOUT_MS if the database lives on slow storage."
                    .to_string(),
            ),

            Self::Import(_) => Some(
                "The store was restored to its state before the import. \
                 Check that the file is a `bk export` snapshot."
                    .to_string(),
            ),

            Self::Validation(_)
            | Self::InvalidArgument(_)
            | Self::Database(_)
            | Self::Export(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
