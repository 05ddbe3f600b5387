//! Consistency checks run before any move is written.
//!
//! Each check maps to one [`MoveError`] variant and they run in a fixed
//! order: source, destination, board boundary, insertion point. A passing
//! validation yields an authorization token recording exactly what was
//! observed, so the later write can be conditioned on it.

use kanban_core::{EntityKind, MoveError, MoveResult};
use serde::Serialize;
use uuid::Uuid;

use crate::board::{Board, BoardId};
use crate::card::{CardId, CardState};
use crate::list::{List, ListId, ListState};
use crate::repository::RepositoryTx;
use crate::sequence::{active_sorted, anchors, InsertionPoint, Neighbors};

/// A validated card move, carrying the state the commit is keyed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizedCardMove {
    pub card_id: CardId,
    pub board_id: BoardId,
    pub source_list_id: ListId,
    pub destination_list_id: ListId,
    #[serde(skip)]
    pub observed: CardState,
    pub neighbors: Neighbors,
}

impl AuthorizedCardMove {
    pub fn is_reorder(&self) -> bool {
        self.source_list_id == self.destination_list_id
    }
}

/// A validated list reorder within its own board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizedListMove {
    pub list_id: ListId,
    pub board_id: BoardId,
    #[serde(skip)]
    pub observed: ListState,
    pub neighbors: Neighbors,
}

pub(crate) async fn require_board(
    tx: &mut dyn RepositoryTx,
    board_id: BoardId,
) -> MoveResult<Board> {
    tx.board(board_id)
        .await?
        .ok_or_else(|| MoveError::not_found(EntityKind::Board, board_id))
}

pub(crate) async fn require_active_board(
    tx: &mut dyn RepositoryTx,
    board_id: BoardId,
) -> MoveResult<Board> {
    let board = require_board(tx, board_id).await?;
    if board.archived {
        return Err(MoveError::archived(EntityKind::Board, board_id));
    }
    Ok(board)
}

pub(crate) async fn require_list(tx: &mut dyn RepositoryTx, list_id: ListId) -> MoveResult<List> {
    tx.list(list_id)
        .await?
        .ok_or_else(|| MoveError::not_found(EntityKind::List, list_id))
}

/// The list must exist, be active, and sit on an active board.
pub(crate) async fn require_active_list(
    tx: &mut dyn RepositoryTx,
    list_id: ListId,
) -> MoveResult<List> {
    let list = require_list(tx, list_id).await?;
    if list.archived {
        return Err(MoveError::archived(EntityKind::List, list_id));
    }
    require_active_board(tx, list.board_id).await?;
    Ok(list)
}

pub async fn authorize_card_move(
    tx: &mut dyn RepositoryTx,
    card_id: CardId,
    destination_list_id: ListId,
    point: &InsertionPoint,
) -> MoveResult<AuthorizedCardMove> {
    let card = tx
        .card(card_id)
        .await?
        .ok_or_else(|| MoveError::not_found(EntityKind::Card, card_id))?;
    if card.archived {
        return Err(MoveError::archived(EntityKind::Card, card_id));
    }
    let source = require_active_list(tx, card.list_id).await?;

    let destination = if destination_list_id == source.id {
        source.clone()
    } else {
        let destination = require_list(tx, destination_list_id).await?;
        if destination.archived {
            return Err(MoveError::archived(EntityKind::List, destination_list_id));
        }
        destination
    };

    if destination.board_id != source.board_id {
        tracing::debug!(
            card = %card_id,
            source_board = %source.board_id,
            destination_board = %destination.board_id,
            "rejecting cross-board move"
        );
        return Err(MoveError::CrossBoardMove {
            source_board: source.board_id,
            destination_list: destination.id,
            destination_board: destination.board_id,
        });
    }

    let siblings = active_sorted(tx.cards_in_list(destination.id).await?, Some(card_id));
    let neighbors =
        Neighbors::resolve(&anchors(&siblings), point).map_err(MoveError::StaleInsertionPoint)?;

    tracing::debug!(
        card = %card_id,
        from = %source.id,
        to = %destination.id,
        ?neighbors,
        "authorized card move"
    );

    Ok(AuthorizedCardMove {
        card_id,
        board_id: source.board_id,
        source_list_id: source.id,
        destination_list_id: destination.id,
        observed: card.state(),
        neighbors,
    })
}

pub async fn authorize_list_move(
    tx: &mut dyn RepositoryTx,
    list_id: ListId,
    point: &InsertionPoint,
) -> MoveResult<AuthorizedListMove> {
    let list = require_list(tx, list_id).await?;
    if list.archived {
        return Err(MoveError::archived(EntityKind::List, list_id));
    }
    require_active_board(tx, list.board_id).await?;

    let siblings = active_sorted(tx.lists_in_board(list.board_id).await?, Some(list_id));
    let sibling_anchors = anchors(&siblings);

    let neighbors = match Neighbors::resolve(&sibling_anchors, point) {
        Ok(neighbors) => neighbors,
        Err(reason) => {
            reject_foreign_anchor(tx, &list, point).await?;
            return Err(MoveError::StaleInsertionPoint(reason));
        }
    };

    tracing::debug!(list = %list_id, board = %list.board_id, ?neighbors, "authorized list move");

    Ok(AuthorizedListMove {
        list_id,
        board_id: list.board_id,
        observed: list.state(),
        neighbors,
    })
}

/// A list anchored to a list of another board is a cross-board move rather
/// than a stale anchor.
async fn reject_foreign_anchor(
    tx: &mut dyn RepositoryTx,
    list: &List,
    point: &InsertionPoint,
) -> MoveResult<()> {
    let anchor_id = match *point {
        InsertionPoint::Before(id) | InsertionPoint::After(id) => id,
        InsertionPoint::AtIndex(_) | InsertionPoint::End => return Ok(()),
    };
    if let Some(anchor) = tx.list(anchor_id).await? {
        if anchor.board_id != list.board_id {
            return Err(MoveError::CrossBoardMove {
                source_board: list.board_id,
                destination_list: anchor.id,
                destination_board: anchor.board_id,
            });
        }
    }
    Ok(())
}

/// Fresh anchors of the active cards in `list_id`, minus the moving card.
pub(crate) async fn card_siblings(
    tx: &mut dyn RepositoryTx,
    list_id: ListId,
    moving: Uuid,
) -> MoveResult<Vec<crate::sequence::Anchor>> {
    let cards = active_sorted(tx.cards_in_list(list_id).await?, Some(moving));
    Ok(anchors(&cards))
}

/// Fresh anchors of the active lists in `board_id`, minus the moving list.
pub(crate) async fn list_siblings(
    tx: &mut dyn RepositoryTx,
    board_id: BoardId,
    moving: Uuid,
) -> MoveResult<Vec<crate::sequence::Anchor>> {
    let lists = active_sorted(tx.lists_in_board(board_id).await?, Some(moving));
    Ok(anchors(&lists))
}
