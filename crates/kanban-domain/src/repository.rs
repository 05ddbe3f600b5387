//! Storage contract the engine composes.
//!
//! Every engine operation runs inside one [`RepositoryTx`]. Writes that
//! replace existing rows are conditional: they name the state they expect
//! to overwrite and report `false` when the row no longer matches. Dropping
//! a transaction without calling [`RepositoryTx::commit`] discards it.

use async_trait::async_trait;
use kanban_core::KanbanResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, BoardId};
use crate::card::{Card, CardId, CardState};
use crate::list::{List, ListId, ListState};
use crate::position::Position;

/// One row of a renumbering pass: `id` moves from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renumbering {
    pub id: Uuid,
    pub from: Position,
    pub to: Position,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRepository: Send + Sync {
    async fn begin(&self) -> KanbanResult<Box<dyn RepositoryTx>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryTx: Send {
    async fn board(&mut self, id: BoardId) -> KanbanResult<Option<Board>>;
    async fn boards(&mut self) -> KanbanResult<Vec<Board>>;
    async fn list(&mut self, id: ListId) -> KanbanResult<Option<List>>;
    /// All lists of a board, archived ones included, in no particular order.
    async fn lists_in_board(&mut self, board_id: BoardId) -> KanbanResult<Vec<List>>;
    async fn card(&mut self, id: CardId) -> KanbanResult<Option<Card>>;
    /// All cards of a list, archived ones included, in no particular order.
    async fn cards_in_list(&mut self, list_id: ListId) -> KanbanResult<Vec<Card>>;

    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()>;
    async fn insert_list(&mut self, list: &List) -> KanbanResult<()>;
    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()>;

    /// Replaces the board row if its archived flag is still `expected_archived`.
    async fn update_board(&mut self, board: &Board, expected_archived: bool) -> KanbanResult<bool>;
    /// Replaces the list row if it still has `expected` position and flag.
    async fn update_list(&mut self, list: &List, expected: ListState) -> KanbanResult<bool>;
    /// Replaces the card row if it still has `expected` list, position and flag.
    async fn update_card(&mut self, card: &Card, expected: CardState) -> KanbanResult<bool>;

    /// Applies a renumbering to the active lists of a board; `false` if any
    /// row's current position differs from its `from`.
    async fn renumber_lists(
        &mut self,
        board_id: BoardId,
        changes: &[Renumbering],
    ) -> KanbanResult<bool>;
    /// Applies a renumbering to the active cards of a list; `false` if any
    /// row's current position differs from its `from`.
    async fn renumber_cards(&mut self, list_id: ListId, changes: &[Renumbering])
        -> KanbanResult<bool>;

    /// Publishes every write of this transaction atomically. Fails with
    /// `KanbanError::UniqueViolation` when two active siblings would share a
    /// position.
    async fn commit(&mut self) -> KanbanResult<()>;
}
