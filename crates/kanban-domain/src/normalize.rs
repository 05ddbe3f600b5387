//! Renumbering of degenerate sequences.
//!
//! A renumbered container holds its active members at `step, 2*step, ...`
//! in their current order. Only rows whose position changes are written, so
//! running it twice leaves the second run with nothing to do.

use kanban_core::{EntityKind, MoveError, MoveResult};
use serde::Serialize;
use uuid::Uuid;

use crate::board::BoardId;
use crate::engine::{write_error, OrderingEngine};
use crate::list::ListId;
use crate::position::Position;
use crate::repository::{ContainerRepository, Renumbering};
use crate::sequence::{active_sorted, Ordered};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Lists within a board.
    Board,
    /// Cards within a list.
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenumberReport {
    pub container: Uuid,
    pub kind: ContainerKind,
    /// Active members in the container.
    pub members: usize,
    /// Members whose position was rewritten.
    pub rewritten: usize,
}

/// Whether `positions` contain a non-finite value, a duplicate, or two
/// neighbors closer than `min_gap`.
pub fn needs_renumbering(positions: &[Position], min_gap: f64) -> bool {
    if positions.iter().any(|p| !p.is_finite()) {
        return true;
    }
    let mut sorted = positions.to_vec();
    sorted.sort();
    sorted.windows(2).any(|pair| {
        let gap = pair[1].value() - pair[0].value();
        gap <= 0.0 || gap < min_gap
    })
}

/// Renumbering for members already in sequence order; unchanged rows are
/// left out.
pub fn plan_renumbering<T: Ordered>(members: &[T], step: f64) -> Vec<Renumbering> {
    members
        .iter()
        .enumerate()
        .filter_map(|(i, member)| {
            let to = Position::nth(i + 1, step);
            (member.position() != to).then(|| Renumbering {
                id: member.id(),
                from: member.position(),
                to,
            })
        })
        .collect()
}

impl<R: ContainerRepository> OrderingEngine<R> {
    /// Renumbers the active cards of an active list.
    pub async fn normalize_list(&self, list_id: ListId) -> MoveResult<RenumberReport> {
        let mut tx = self.begin().await?;
        validation::require_active_list(tx.as_mut(), list_id).await?;

        let cards = active_sorted(tx.cards_in_list(list_id).await?, None);
        let plan = plan_renumbering(&cards, self.allocator().step());
        let report = RenumberReport {
            container: list_id,
            kind: ContainerKind::List,
            members: cards.len(),
            rewritten: plan.len(),
        };
        if plan.is_empty() {
            return Ok(report);
        }

        let applied = tx
            .renumber_cards(list_id, &plan)
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;
        if !applied {
            return Err(MoveError::concurrent(EntityKind::List, list_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;

        tracing::info!(list = %list_id, rewritten = report.rewritten, "renumbered cards");
        Ok(report)
    }

    /// Renumbers the active lists of an active board.
    pub async fn normalize_board(&self, board_id: BoardId) -> MoveResult<RenumberReport> {
        let mut tx = self.begin().await?;
        validation::require_active_board(tx.as_mut(), board_id).await?;

        let lists = active_sorted(tx.lists_in_board(board_id).await?, None);
        let plan = plan_renumbering(&lists, self.allocator().step());
        let report = RenumberReport {
            container: board_id,
            kind: ContainerKind::Board,
            members: lists.len(),
            rewritten: plan.len(),
        };
        if plan.is_empty() {
            return Ok(report);
        }

        let applied = tx
            .renumber_lists(board_id, &plan)
            .await
            .map_err(|e| write_error(e, EntityKind::Board, board_id))?;
        if !applied {
            return Err(MoveError::concurrent(EntityKind::Board, board_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Board, board_id))?;

        tracing::info!(board = %board_id, rewritten = report.rewritten, "renumbered lists");
        Ok(report)
    }
}
