use clap::{Args, Parser, Subcommand};
use kanban_domain::InsertionPoint;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "Ordered boards, lists and cards from the command line", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")"))]
pub struct Cli {
    /// Path to kanban data file (or set KANBAN_FILE env var)
    #[arg(long, short = 'f', value_name = "FILE", env = "KANBAN_FILE", global = true)]
    pub file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Board operations
    Board(BoardCommand),
    /// List operations
    List(ListCommand),
    /// Card operations
    Card(CardCommand),
    /// Renumber every fragmented board and list
    Sweep {
        /// Keep sweeping at the configured `sweep_interval_secs` until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Where a moved list or card lands. Without any flag it goes to the end.
#[derive(Args, Debug, Clone, Default)]
pub struct InsertionArgs {
    /// Place directly before this sibling
    #[arg(long, conflicts_with_all = ["after", "index"])]
    pub before: Option<Uuid>,
    /// Place directly after this sibling
    #[arg(long, conflicts_with = "index")]
    pub after: Option<Uuid>,
    /// Place at this zero-based index among the active siblings
    #[arg(long)]
    pub index: Option<usize>,
}

impl InsertionArgs {
    pub fn point(&self) -> InsertionPoint {
        match (self.before, self.after, self.index) {
            (Some(id), _, _) => InsertionPoint::Before(id),
            (_, Some(id), _) => InsertionPoint::After(id),
            (_, _, Some(index)) => InsertionPoint::AtIndex(index),
            _ => InsertionPoint::End,
        }
    }
}

// Board commands
#[derive(Args)]
pub struct BoardCommand {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Create a new board
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        tenant_id: Option<Uuid>,
    },
    /// List boards
    List {
        /// Include archived boards
        #[arg(long)]
        archived: bool,
    },
    /// Get a specific board
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Archive a board
    Archive {
        #[arg(long)]
        id: Uuid,
    },
    /// Restore an archived board
    Restore {
        #[arg(long)]
        id: Uuid,
    },
    /// Rewrite list positions of a board to even spacing
    Normalize {
        #[arg(long)]
        id: Uuid,
    },
    /// Show the lists of a board in order
    Lists {
        #[arg(long)]
        id: Uuid,
        /// Append archived lists after the active ones
        #[arg(long)]
        archived: bool,
    },
}

// List commands
#[derive(Args)]
pub struct ListCommand {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Create a new list at the end of a board
    Create {
        #[arg(long)]
        board_id: Uuid,
        #[arg(long)]
        name: String,
    },
    /// Get a specific list
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Move a list within its board
    Move {
        #[arg(long)]
        id: Uuid,
        #[command(flatten)]
        insertion: InsertionArgs,
    },
    /// Archive a list
    Archive {
        #[arg(long)]
        id: Uuid,
    },
    /// Restore an archived list
    Restore {
        #[arg(long)]
        id: Uuid,
    },
    /// Rewrite card positions of a list to even spacing
    Normalize {
        #[arg(long)]
        id: Uuid,
    },
    /// Show the cards of a list in order
    Cards {
        #[arg(long)]
        id: Uuid,
        /// Append archived cards after the active ones
        #[arg(long)]
        archived: bool,
    },
}

// Card commands
#[derive(Args)]
pub struct CardCommand {
    #[command(subcommand)]
    pub action: CardAction,
}

#[derive(Subcommand)]
pub enum CardAction {
    /// Create a new card at the end of a list
    Create(CardCreateArgs),
    /// Get a specific card
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Move a card within its list or to another list of the same board
    Move {
        #[arg(long)]
        id: Uuid,
        /// Destination list (defaults to the card's current list)
        #[arg(long)]
        list_id: Option<Uuid>,
        #[command(flatten)]
        insertion: InsertionArgs,
    },
    /// Archive a card
    Archive {
        #[arg(long)]
        id: Uuid,
    },
    /// Restore an archived card
    Restore {
        #[arg(long)]
        id: Uuid,
        /// Restore into this list instead of the original one
        #[arg(long)]
        list_id: Option<Uuid>,
    },
}

#[derive(Args)]
pub struct CardCreateArgs {
    #[arg(long)]
    pub list_id: Uuid,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Due date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub due_date: Option<String>,
}
