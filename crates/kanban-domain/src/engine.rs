//! Move orchestration: validate, allocate, conditionally write.

use kanban_core::{EngineConfig, EntityKind, KanbanError, KanbanResult, MoveError, MoveResult};
use serde::Serialize;
use uuid::Uuid;

use crate::card::{Card, CardId};
use crate::list::{List, ListId};
use crate::normalize::RenumberReport;
use crate::position::{is_fragmented, PositionAllocator};
use crate::repository::{ContainerRepository, RepositoryTx};
use crate::sequence::InsertionPoint;
use crate::validation::{self, AuthorizedCardMove, AuthorizedListMove};

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveOutcome<T> {
    pub entity: T,
    /// `false` when the entity already sat at the requested place and
    /// nothing was written.
    pub moved: bool,
    /// Follow-up renumbering of the destination container, when the move
    /// left it fragmented.
    pub renumbered: Option<RenumberReport>,
}

impl<T> MoveOutcome<T> {
    fn unchanged(entity: T) -> Self {
        Self {
            entity,
            moved: false,
            renumbered: None,
        }
    }
}

/// Public entry point for ordering operations over a [`ContainerRepository`].
///
/// Holds no state besides the repository and its configuration; share it
/// behind an `Arc` to serve concurrent callers.
pub struct OrderingEngine<R> {
    repo: R,
    config: EngineConfig,
    allocator: PositionAllocator,
}

/// Maps a store failure raised while writing `kind`/`id` onto the move
/// taxonomy. A uniqueness violation at this point means allocation and
/// validation disagreed with the store.
pub(crate) fn write_error(err: KanbanError, kind: EntityKind, id: Uuid) -> MoveError {
    match err {
        KanbanError::UniqueViolation(detail) => {
            tracing::error!(%kind, %id, %detail, "position uniqueness violated after validation");
            MoveError::InvariantViolation(detail)
        }
        KanbanError::Conflict(_) => MoveError::concurrent(kind, id),
        other => MoveError::Store(other),
    }
}

impl<R: ContainerRepository> OrderingEngine<R> {
    pub fn new(repo: R) -> Self {
        Self::build(repo, EngineConfig::default())
    }

    pub fn with_config(repo: R, config: EngineConfig) -> KanbanResult<Self> {
        config.validate()?;
        Ok(Self::build(repo, config))
    }

    fn build(repo: R, config: EngineConfig) -> Self {
        let allocator = PositionAllocator::new(config.position_step);
        Self {
            repo,
            config,
            allocator,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn allocator(&self) -> &PositionAllocator {
        &self.allocator
    }

    pub(crate) async fn begin(&self) -> MoveResult<Box<dyn RepositoryTx>> {
        Ok(self.repo.begin().await?)
    }

    /// Moves a card into `destination_list_id` at `point`.
    pub async fn move_card(
        &self,
        card_id: CardId,
        destination_list_id: ListId,
        point: InsertionPoint,
    ) -> MoveResult<MoveOutcome<Card>> {
        let authorized = self
            .authorize_card_move(card_id, destination_list_id, point)
            .await?;
        self.commit_card_move(authorized).await
    }

    /// Reorders a card within the list that currently holds it.
    pub async fn reorder_card(
        &self,
        card_id: CardId,
        point: InsertionPoint,
    ) -> MoveResult<MoveOutcome<Card>> {
        let card = self.card(card_id).await?;
        self.move_card(card_id, card.list_id, point).await
    }

    /// Validates a card move against the current state without writing.
    pub async fn authorize_card_move(
        &self,
        card_id: CardId,
        destination_list_id: ListId,
        point: InsertionPoint,
    ) -> MoveResult<AuthorizedCardMove> {
        let mut tx = self.begin().await?;
        validation::authorize_card_move(tx.as_mut(), card_id, destination_list_id, &point).await
    }

    /// Writes a previously authorized card move, provided neither the card
    /// nor its destination neighbors changed since authorization.
    pub async fn commit_card_move(
        &self,
        authorized: AuthorizedCardMove,
    ) -> MoveResult<MoveOutcome<Card>> {
        let card_id = authorized.card_id;
        let destination = authorized.destination_list_id;
        let mut tx = self.begin().await?;

        let current = tx
            .card(card_id)
            .await?
            .ok_or_else(|| MoveError::not_found(EntityKind::Card, card_id))?;
        if current.state() != authorized.observed {
            tracing::debug!(card = %card_id, "card changed since authorization");
            return Err(MoveError::concurrent(EntityKind::Card, card_id));
        }

        validation::require_active_list(tx.as_mut(), destination).await?;
        let siblings = validation::card_siblings(tx.as_mut(), destination, card_id).await?;
        authorized
            .neighbors
            .verify(&siblings)
            .map_err(MoveError::StaleInsertionPoint)?;

        if authorized.is_reorder() && authorized.neighbors.contains(current.position) {
            tracing::debug!(card = %card_id, "card already in place");
            return Ok(MoveOutcome::unchanged(current));
        }

        let position = self
            .allocator
            .allocate(&authorized.neighbors)
            .map_err(|_| MoveError::PrecisionExhausted {
                container: destination,
            })?;

        let mut moved = current;
        moved.move_to_list(destination, position);
        let written = tx
            .update_card(&moved, authorized.observed)
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::Card, card_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::Card, card_id))?;
        drop(tx);

        tracing::info!(
            card = %card_id,
            from = %authorized.source_list_id,
            to = %destination,
            position = %position,
            "moved card"
        );

        let mut outcome = MoveOutcome {
            entity: moved,
            moved: true,
            renumbered: None,
        };
        if is_fragmented(position, &authorized.neighbors, self.config.min_gap) {
            outcome.renumbered = self.follow_up_list(destination).await;
            if outcome.renumbered.is_some() {
                if let Ok(card) = self.card(card_id).await {
                    outcome.entity = card;
                }
            }
        }
        Ok(outcome)
    }

    /// Reorders a list within its board.
    pub async fn move_list(
        &self,
        list_id: ListId,
        point: InsertionPoint,
    ) -> MoveResult<MoveOutcome<List>> {
        let authorized = self.authorize_list_move(list_id, point).await?;
        self.commit_list_move(authorized).await
    }

    pub async fn authorize_list_move(
        &self,
        list_id: ListId,
        point: InsertionPoint,
    ) -> MoveResult<AuthorizedListMove> {
        let mut tx = self.begin().await?;
        validation::authorize_list_move(tx.as_mut(), list_id, &point).await
    }

    pub async fn commit_list_move(
        &self,
        authorized: AuthorizedListMove,
    ) -> MoveResult<MoveOutcome<List>> {
        let list_id = authorized.list_id;
        let board_id = authorized.board_id;
        let mut tx = self.begin().await?;

        let current = validation::require_list(tx.as_mut(), list_id).await?;
        if current.state() != authorized.observed {
            tracing::debug!(list = %list_id, "list changed since authorization");
            return Err(MoveError::concurrent(EntityKind::List, list_id));
        }
        validation::require_active_board(tx.as_mut(), board_id).await?;

        let siblings = validation::list_siblings(tx.as_mut(), board_id, list_id).await?;
        authorized
            .neighbors
            .verify(&siblings)
            .map_err(MoveError::StaleInsertionPoint)?;

        if authorized.neighbors.contains(current.position) {
            tracing::debug!(list = %list_id, "list already in place");
            return Ok(MoveOutcome::unchanged(current));
        }

        let position = self
            .allocator
            .allocate(&authorized.neighbors)
            .map_err(|_| MoveError::PrecisionExhausted {
                container: board_id,
            })?;

        let mut moved = current;
        moved.update_position(position);
        let written = tx
            .update_list(&moved, authorized.observed)
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;
        if !written {
            return Err(MoveError::concurrent(EntityKind::List, list_id));
        }
        tx.commit()
            .await
            .map_err(|e| write_error(e, EntityKind::List, list_id))?;
        drop(tx);

        tracing::info!(list = %list_id, board = %board_id, position = %position, "moved list");

        let mut outcome = MoveOutcome {
            entity: moved,
            moved: true,
            renumbered: None,
        };
        if is_fragmented(position, &authorized.neighbors, self.config.min_gap) {
            outcome.renumbered = self.follow_up_board(board_id).await;
            if outcome.renumbered.is_some() {
                if let Ok(list) = self.list(list_id).await {
                    outcome.entity = list;
                }
            }
        }
        Ok(outcome)
    }

    async fn follow_up_list(&self, list_id: ListId) -> Option<RenumberReport> {
        if !self.config.auto_normalize {
            return None;
        }
        match self.normalize_list(list_id).await {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(list = %list_id, error = %err, "follow-up renumbering failed");
                None
            }
        }
    }

    async fn follow_up_board(&self, board_id: Uuid) -> Option<RenumberReport> {
        if !self.config.auto_normalize {
            return None;
        }
        match self.normalize_board(board_id).await {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(board = %board_id, error = %err, "follow-up renumbering failed");
                None
            }
        }
    }
}
