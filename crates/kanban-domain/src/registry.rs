//! Creating, archiving, restoring and reading boards, lists and cards.

use kanban_core::{EntityKind, KanbanError, MoveError, MoveResult};
use uuid::Uuid;

use crate::board::{Board, BoardId};
use crate::card::{Card, CardDraft, CardId};
use crate::engine::{write_error, OrderingEngine};
use crate::list::{List, ListId};
use crate::position::{AllocationError, Position, PositionAllocator};
use crate::repository::ContainerRepository;
use crate::sequence::{active_sorted, sort_members, Ordered};
use crate::validation;

fn require_name(field: &str, value: &str) -> MoveResult<()> {
    if value.trim().is_empty() {
        return Err(KanbanError::Validation(format!("{} cannot be empty", field)).into());
    }
    Ok(())
}

/// Active members in sequence order, optionally followed by the archived
/// ones in their last known order.
fn ordered<T: Ordered>(items: Vec<T>, include_archived: bool) -> Vec<T> {
    let (mut archived, active): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| item.is_archived());
    let mut members = active_sorted(active, None);
    if include_archived {
        sort_members(&mut archived);
        members.extend(archived);
    }
    members
}

/// Position a restored member returns to: its old slot when no active
/// sibling took it meanwhile, otherwise the end of the sequence.
fn restore_slot<T: Ordered>(
    allocator: &PositionAllocator,
    previous: Option<Position>,
    siblings: &[T],
) -> Result<Position, AllocationError> {
    if let Some(position) = previous {
        if siblings.iter().all(|s| s.position() != position) {
            return Ok(position);
        }
    }
    allocator.append(siblings.last().map(|s| s.position()))
}

impl<R: ContainerRepository> OrderingEngine<R> {
    pub async fn create_board(&self, name: String, tenant_id: Option<Uuid>) -> MoveResult<Board> {
        require_name("Board name", &name)?;
        let board = Board::new(name, tenant_id);

        let mut tx = self.begin().await?;
        tx.insert_board(&board).await?;
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Board, board.id))?;

        tracing::info!(board = %board.id, name = %board.name, "created board");
        Ok(board)
    }

    /// Appends a new list to an active board.
    pub async fn create_list(&self, board_id: BoardId, name: String) -> MoveResult<List> {
        require_name("List name", &name)?;
        let mut tx = self.begin().await?;
        validation::require_active_board(tx.as_mut(), board_id).await?;

        let siblings = active_sorted(tx.lists_in_board(board_id).await?, None);
        let position = self
            .allocator()
            .append(siblings.last().map(|l| l.position))
            .map_err(|_| MoveError::PrecisionExhausted {
                container: board_id,
            })?;

        let list = List::new(board_id, name, position);
        tx.insert_list(&list).await?;
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::List, list.id))?;

        tracing::info!(list = %list.id, board = %board_id, position = %position, "created list");
        Ok(list)
    }

    /// Appends a new card to an active list.
    pub async fn create_card(&self, list_id: ListId, draft: CardDraft) -> MoveResult<Card> {
        require_name("Card title", &draft.title)?;
        let mut tx = self.begin().await?;
        validation::require_active_list(tx.as_mut(), list_id).await?;

        let siblings = active_sorted(tx.cards_in_list(list_id).await?, None);
        let position = self
            .allocator()
            .append(siblings.last().map(|c| c.position))
            .map_err(|_| MoveError::PrecisionExhausted { container: list_id })?;

        let card = Card::new(list_id, draft, position);
        tx.insert_card(&card).await?;
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card.id))?;

        tracing::info!(card = %card.id, list = %list_id, position = %position, "created card");
        Ok(card)
    }

    /// Archives a board. Its lists and cards keep their own flags but stop
    /// accepting moves while the board is archived. Archiving twice is a no-op.
    pub async fn archive_board(&self, board_id: BoardId) -> MoveResult<Board> {
        self.set_board_archived(board_id, true).await
    }

    pub async fn restore_board(&self, board_id: BoardId) -> MoveResult<Board> {
        self.set_board_archived(board_id, false).await
    }

    async fn set_board_archived(&self, board_id: BoardId, archived: bool) -> MoveResult<Board> {
        let mut tx = self.begin().await?;
        let mut board = validation::require_board(tx.as_mut(), board_id).await?;
        if board.archived == archived {
            return Ok(board);
        }

        board.set_archived(archived);
        let written = tx
            .update_board(&board, !archived)
            .await
            .map_err(|e| write_error(e, EntityKind::Board, board_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::Board, board_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Board, board_id))?;

        tracing::info!(board = %board_id, archived, "updated board archive flag");
        Ok(board)
    }

    /// Archives a list. Its position stays on the row but no longer counts
    /// against its board's sequence.
    pub async fn archive_list(&self, list_id: ListId) -> MoveResult<List> {
        let mut tx = self.begin().await?;
        let mut list = validation::require_list(tx.as_mut(), list_id).await?;
        if list.archived {
            return Ok(list);
        }

        let observed = list.state();
        list.set_archived(true);
        let written = tx
            .update_list(&list, observed)
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::List, list_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;

        tracing::info!(list = %list_id, "archived list");
        Ok(list)
    }

    /// Restores a list to its board, at its old position if still free,
    /// otherwise at the end.
    pub async fn restore_list(&self, list_id: ListId) -> MoveResult<List> {
        let mut tx = self.begin().await?;
        let mut list = validation::require_list(tx.as_mut(), list_id).await?;
        if !list.archived {
            return Ok(list);
        }
        validation::require_active_board(tx.as_mut(), list.board_id).await?;

        let siblings = active_sorted(tx.lists_in_board(list.board_id).await?, Some(list_id));
        let position = restore_slot(self.allocator(), Some(list.position), &siblings)
            .map_err(|_| MoveError::PrecisionExhausted {
                container: list.board_id,
            })?;

        let observed = list.state();
        list.set_archived(false);
        list.update_position(position);
        let written = tx
            .update_list(&list, observed)
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::List, list_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;

        tracing::info!(list = %list_id, position = %position, "restored list");
        Ok(list)
    }

    pub async fn archive_card(&self, card_id: CardId) -> MoveResult<Card> {
        let mut tx = self.begin().await?;
        let mut card = tx
            .card(card_id)
            .await?
            .ok_or_else(|| MoveError::not_found(EntityKind::Card, card_id))?;
        if card.archived {
            return Ok(card);
        }

        let observed = card.state();
        card.set_archived(true);
        let written = tx
            .update_card(&card, observed)
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::Card, card_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card_id))?;

        tracing::info!(card = %card_id, "archived card");
        Ok(card)
    }

    /// Restores an archived card into `list_id` (default: the list it was
    /// archived from). The target list must be active and on the same board.
    pub async fn restore_card(&self, card_id: CardId, list_id: Option<ListId>) -> MoveResult<Card> {
        let mut tx = self.begin().await?;
        let mut card = tx
            .card(card_id)
            .await?
            .ok_or_else(|| MoveError::not_found(EntityKind::Card, card_id))?;
        if !card.archived {
            return Ok(card);
        }

        let home = validation::require_list(tx.as_mut(), card.list_id).await?;
        let target_id = list_id.unwrap_or(card.list_id);
        let target = validation::require_active_list(tx.as_mut(), target_id).await?;
        if target.board_id != home.board_id {
            return Err(MoveError::CrossBoardMove {
                source_board: home.board_id,
                destination_list: target.id,
                destination_board: target.board_id,
            });
        }

        let siblings = active_sorted(tx.cards_in_list(target_id).await?, Some(card_id));
        let previous = (target_id == card.list_id).then_some(card.position);
        let position = restore_slot(self.allocator(), previous, &siblings)
            .map_err(|_| MoveError::PrecisionExhausted {
                container: target_id,
            })?;

        let observed = card.state();
        card.set_archived(false);
        card.move_to_list(target_id, position);
        let written = tx
            .update_card(&card, observed)
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::Card, card_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card_id))?;

        tracing::info!(card = %card_id, list = %target_id, position = %position, "restored card");
        Ok(card)
    }

    pub async fn board(&self, board_id: BoardId) -> MoveResult<Board> {
        let mut tx = self.begin().await?;
        validation::require_board(tx.as_mut(), board_id).await
    }

    pub async fn list(&self, list_id: ListId) -> MoveResult<List> {
        let mut tx = self.begin().await?;
        validation::require_list(tx.as_mut(), list_id).await
    }

    pub async fn card(&self, card_id: CardId) -> MoveResult<Card> {
        let mut tx = self.begin().await?;
        tx.card(card_id)
            .await?
            .ok_or_else(|| MoveError::not_found(EntityKind::Card, card_id))
    }

    /// Boards ordered by creation time.
    pub async fn boards(&self, include_archived: bool) -> MoveResult<Vec<Board>> {
        let mut tx = self.begin().await?;
        let mut boards = tx.boards().await?;
        boards.retain(|b| include_archived || b.is_active());
        boards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(boards)
    }

    /// Lists of a board in display order.
    pub async fn board_lists(
        &self,
        board_id: BoardId,
        include_archived: bool,
    ) -> MoveResult<Vec<List>> {
        let mut tx = self.begin().await?;
        validation::require_board(tx.as_mut(), board_id).await?;
        Ok(ordered(tx.lists_in_board(board_id).await?, include_archived))
    }

    /// Cards of a list in display order.
    pub async fn list_cards(
        &self,
        list_id: ListId,
        include_archived: bool,
    ) -> MoveResult<Vec<Card>> {
        let mut tx = self.begin().await?;
        validation::require_list(tx.as_mut(), list_id).await?;
        Ok(ordered(tx.cards_in_list(list_id).await?, include_archived))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_puts_archived_last() {
        let board_id = Uuid::new_v4();
        let a = List::new(board_id, "a".into(), Position::new(2000.0));
        let mut b = List::new(board_id, "b".into(), Position::new(500.0));
        b.archived = true;
        let c = List::new(board_id, "c".into(), Position::new(1000.0));

        let active = ordered(vec![a.clone(), b.clone(), c.clone()], false);
        assert_eq!(
            active.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![c.id, a.id]
        );

        let all = ordered(vec![a.clone(), b.clone(), c.clone()], true);
        assert_eq!(
            all.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![c.id, a.id, b.id]
        );
    }

    #[test]
    fn test_restore_slot_keeps_free_position() {
        let board_id = Uuid::new_v4();
        let siblings = vec![List::new(board_id, "a".into(), Position::new(1000.0))];
        let allocator = PositionAllocator::new(1000.0);
        let slot = restore_slot(&allocator, Some(Position::new(500.0)), &siblings).unwrap();
        assert_eq!(slot, Position::new(500.0));
    }

    #[test]
    fn test_restore_slot_appends_when_taken() {
        let board_id = Uuid::new_v4();
        let siblings = vec![
            List::new(board_id, "a".into(), Position::new(1000.0)),
            List::new(board_id, "b".into(), Position::new(2000.0)),
        ];
        let allocator = PositionAllocator::new(1000.0);
        let slot = restore_slot(&allocator, Some(Position::new(1000.0)), &siblings).unwrap();
        assert_eq!(slot, Position::new(3000.0));
        assert_eq!(
            restore_slot(&allocator, None, &siblings).unwrap(),
            Position::new(3000.0)
        );
    }
}
