use crate::error::{KanbanError, MoveError};

pub type KanbanResult<T> = Result<T, KanbanError>;

pub type MoveResult<T> = Result<T, MoveError>;
