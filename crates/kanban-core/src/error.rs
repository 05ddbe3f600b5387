use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Store-level failures surfaced by repositories and persistence backends.
#[derive(Error, Debug)]
pub enum KanbanError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A conditional write found a different state than the one it was keyed on.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// The non-archived `(container, position)` uniqueness constraint rejected a commit.
    #[error("Uniqueness constraint violated: {0}")]
    UniqueViolation(String),
}

/// Kind of record a move error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Board,
    List,
    Card,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Board => "Board",
            Self::List => "List",
            Self::Card => "Card",
        };
        f.write_str(name)
    }
}

/// Closed taxonomy of move, create and renumber failures.
///
/// Every variant except [`MoveError::InvariantViolation`] is a recoverable,
/// caller-visible condition. The engine never retries on its own.
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("{kind} {id} is archived")]
    Archived { kind: EntityKind, id: Uuid },

    #[error(
        "List {destination_list} belongs to board {destination_board}, \
         but the card lives on board {source_board}"
    )]
    CrossBoardMove {
        source_board: Uuid,
        destination_list: Uuid,
        destination_board: Uuid,
    },

    #[error("Stale insertion point: {0}")]
    StaleInsertionPoint(String),

    #[error("No distinct position left in container {container}; normalize it before retrying")]
    PrecisionExhausted { container: Uuid },

    #[error("{kind} {id} was modified concurrently; re-read before retrying")]
    ConcurrentModification { kind: EntityKind, id: Uuid },

    #[error("Ordering invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(#[from] KanbanError),
}

impl MoveError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn archived(kind: EntityKind, id: Uuid) -> Self {
        Self::Archived { kind, id }
    }

    pub fn concurrent(kind: EntityKind, id: Uuid) -> Self {
        Self::ConcurrentModification { kind, id }
    }

    /// Stable machine-readable code, used by the CLI error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Archived { .. } => "archived",
            Self::CrossBoardMove { .. } => "cross_board_move",
            Self::StaleInsertionPoint(_) => "stale_insertion_point",
            Self::PrecisionExhausted { .. } => "precision_exhausted",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Store(_) => "store",
        }
    }

    /// Whether a caller may re-read and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}
