//! CLI definitions using clap.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Boardkeep - kanban boards in a local database
#[derive(Parser, Debug)]
#[command(name = "bk", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.boardkeep/data/boardkeep.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "BK_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON (for agent integration)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and seed a starter board
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Workspace management
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },

    /// Board management
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },

    /// Column management
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },

    /// Task management
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Notes, links and file references attached to a board
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Task, board and activity statistics
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },

    /// List open tasks with no recent activity
    Stale {
        /// Idle days before a task counts as stale (default: BK_STALE_DAYS or 14)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Move stale tasks into each board's backlog column
    Sweep {
        /// Idle days before a task counts as stale (default: BK_STALE_DAYS or 14)
        #[arg(long)]
        days: Option<u32>,

        /// Moves per batch (default: BK_SWEEP_BATCH or 50)
        #[arg(long)]
        batch: Option<usize>,
    },

    /// Write a full snapshot of the database to a file
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Replace the database contents with a snapshot file
    Import {
        /// Snapshot file
        input: PathBuf,
    },

    /// Check the database for broken references
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Workspace Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommands {
    /// Create a workspace
    Create {
        /// Workspace name
        name: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List workspaces
    List,

    /// Show a workspace and its boards
    Show {
        /// Workspace ID
        id: String,
    },

    /// Rename or describe a workspace
    Update {
        /// Workspace ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a workspace with all its boards, columns and tasks
    Delete {
        /// Workspace ID
        id: String,
    },
}

// ============================================================================
// Board Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Create a board with the default columns
    Create {
        /// Owning workspace ID
        workspace_id: String,

        /// Board name
        name: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List boards in a workspace
    List {
        /// Workspace ID
        workspace_id: String,
    },

    /// Show a board with its columns and tasks
    Show {
        /// Board ID
        id: String,
    },

    /// Rename or describe a board
    Update {
        /// Board ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a board with its columns, tasks and items
    Delete {
        /// Board ID
        id: String,
    },
}

// ============================================================================
// Column Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ColumnCommands {
    /// Add a column to a board
    Add {
        /// Board ID
        board_id: String,

        /// Column name
        name: String,

        /// Zero-based position (default: last)
        #[arg(long)]
        position: Option<usize>,
    },

    /// List a board's columns
    List {
        /// Board ID
        board_id: String,
    },

    /// Rename a column
    Rename {
        /// Column ID
        id: String,

        /// New name
        name: String,
    },

    /// Set the column order of a board
    Reorder {
        /// Board ID
        board_id: String,

        /// Every column ID of the board, in the new order
        #[arg(required = true, num_args = 1..)]
        column_ids: Vec<String>,
    },

    /// Delete a column and its tasks
    Delete {
        /// Column ID
        id: String,
    },
}

// ============================================================================
// Task Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Create(TaskCreateArgs),

    /// List tasks of a column or a whole board
    List(TaskListArgs),

    /// Show task details
    Show {
        /// Task ID
        id: String,

        /// Include the audit trail
        #[arg(long)]
        events: bool,
    },

    /// Update a task
    Update(TaskUpdateArgs),

    /// Move a task to another column or position
    Move {
        /// Task ID
        id: String,

        /// Destination column ID
        #[arg(long)]
        to: String,

        /// Position in the destination column (default: last)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Add a comment to a task
    Comment {
        /// Task ID
        id: String,

        /// Comment text
        text: String,

        /// Comment author (default: the actor)
        #[arg(long)]
        author: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct TaskCreateArgs {
    /// Column ID
    pub column_id: String,

    /// Task text
    pub content: String,

    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Priority (low, medium, high; synonyms like "urgent" accepted)
    #[arg(short, long, default_value = "medium")]
    pub priority: String,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,

    /// Labels (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Assignee
    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("scope").required(true).args(["column_id", "board"])))]
pub struct TaskListArgs {
    /// Column ID
    pub column_id: Option<String>,

    /// List every task of this board instead
    #[arg(long)]
    pub board: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskUpdateArgs {
    /// Task ID
    pub id: String,

    /// New task text
    #[arg(long)]
    pub content: Option<String>,

    /// New description ("none" clears it)
    #[arg(short, long)]
    pub description: Option<String>,

    /// New priority
    #[arg(short, long)]
    pub priority: Option<String>,

    /// New due date (YYYY-MM-DD, "none" clears it)
    #[arg(long)]
    pub due: Option<String>,

    /// Replace labels (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Option<Vec<String>>,

    /// New assignee ("none" clears it)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Progress 0-100
    #[arg(long)]
    pub percent: Option<u8>,

    /// Mark completed or open
    #[arg(long)]
    pub completed: Option<bool>,
}

// ============================================================================
// Item Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Attach a note, link or file reference to a board
    Create {
        /// Board ID
        board_id: String,

        /// Item content (text, URL or path)
        content: String,

        /// Item type: note, link, file
        #[arg(long = "type", default_value = "note")]
        item_type: String,

        /// Metadata entries (key=value, repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,
    },

    /// List a board's items
    List {
        /// Board ID
        board_id: String,
    },

    /// Link an item to a task
    Link {
        /// Item ID
        item_id: String,

        /// Task ID
        task_id: String,
    },

    /// Remove a link between an item and a task
    Unlink {
        /// Item ID
        item_id: String,

        /// Task ID
        task_id: String,
    },

    /// Delete an item
    Delete {
        /// Item ID
        id: String,
    },
}

// ============================================================================
// Analytics Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AnalyticsCommands {
    /// Dwell and cycle time of one task
    Task {
        /// Task ID
        id: String,
    },

    /// Completion, priority and column breakdown of a board
    Board {
        /// Board ID
        id: String,
    },

    /// Store-wide counters
    Activity,
}
