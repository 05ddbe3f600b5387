use crate::traits::{PersistenceStore, Snapshot};
use async_trait::async_trait;
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Board, BoardId, Card, CardId, CardState, ContainerRepository, List, ListId, ListState,
    Renumbering, RepositoryTx,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct StoreState {
    boards: HashMap<BoardId, Board>,
    lists: HashMap<ListId, List>,
    cards: HashMap<CardId, Card>,
}

impl StoreState {
    fn from_snapshot(snapshot: Snapshot) -> KanbanResult<Self> {
        let mut state = Self::default();
        for board in snapshot.boards {
            state.boards.insert(board.id, board);
        }
        for list in snapshot.lists {
            if !state.boards.contains_key(&list.board_id) {
                return Err(KanbanError::Validation(format!(
                    "list {} references unknown board {}",
                    list.id, list.board_id
                )));
            }
            state.lists.insert(list.id, list);
        }
        for card in snapshot.cards {
            if !state.lists.contains_key(&card.list_id) {
                return Err(KanbanError::Validation(format!(
                    "card {} references unknown list {}",
                    card.id, card.list_id
                )));
            }
            state.cards.insert(card.id, card);
        }
        state.check_unique_positions()?;
        Ok(state)
    }

    fn snapshot(&self) -> Snapshot {
        fn sorted<T: Clone>(
            items: &HashMap<Uuid, T>,
            key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid),
        ) -> Vec<T> {
            let mut out: Vec<T> = items.values().cloned().collect();
            out.sort_by_key(|item| key(item));
            out
        }
        Snapshot {
            boards: sorted(&self.boards, |b| (b.created_at, b.id)),
            lists: sorted(&self.lists, |l| (l.created_at, l.id)),
            cards: sorted(&self.cards, |c| (c.created_at, c.id)),
        }
    }

    /// No two active lists of a board, and no two active cards of a list,
    /// may share a position.
    fn check_unique_positions(&self) -> KanbanResult<()> {
        let mut seen = HashSet::new();
        for list in self.lists.values().filter(|l| !l.archived) {
            if !seen.insert((list.board_id, list.position.value().to_bits())) {
                return Err(KanbanError::UniqueViolation(format!(
                    "lists(board_id, position): {} at {} on board {}",
                    list.id, list.position, list.board_id
                )));
            }
        }
        seen.clear();
        for card in self.cards.values().filter(|c| !c.archived) {
            if !seen.insert((card.list_id, card.position.value().to_bits())) {
                return Err(KanbanError::UniqueViolation(format!(
                    "cards(list_id, position): {} at {} in list {}",
                    card.id, card.position, card.list_id
                )));
            }
        }
        Ok(())
    }
}

/// In-process repository. Transactions are serialized by a single lock and
/// work on a private copy that replaces the shared state on commit.
///
/// When built with [`MemoryStore::open`], each commit is first written
/// through to the backing [`PersistenceStore`]; a failed save leaves the
/// in-memory state untouched.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    backing: Option<Arc<dyn PersistenceStore>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `snapshot`, rejecting dangling references and
    /// duplicate active positions.
    pub fn from_snapshot(snapshot: Snapshot) -> KanbanResult<Self> {
        Ok(Self {
            state: Arc::new(Mutex::new(StoreState::from_snapshot(snapshot)?)),
            backing: None,
        })
    }

    /// Loads whatever `backing` holds (nothing, for a fresh store) and keeps
    /// writing commits through to it.
    pub async fn open(backing: Arc<dyn PersistenceStore>) -> KanbanResult<Self> {
        let state = match backing.load().await? {
            Some((snapshot, metadata)) => {
                tracing::info!(
                    "Loaded {} boards, {} lists, {} cards saved at {}",
                    snapshot.boards.len(),
                    snapshot.lists.len(),
                    snapshot.cards.len(),
                    metadata.saved_at
                );
                StoreState::from_snapshot(snapshot)?
            }
            None => StoreState::default(),
        };
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            backing: Some(backing),
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }
}

#[async_trait]
impl ContainerRepository for MemoryStore {
    async fn begin(&self) -> KanbanResult<Box<dyn RepositoryTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let view = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            view,
            backing: self.backing.clone(),
            dirty: false,
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<StoreState>,
    view: StoreState,
    backing: Option<Arc<dyn PersistenceStore>>,
    dirty: bool,
}

impl MemoryTx {
    fn renumber<T>(
        rows: &mut HashMap<Uuid, T>,
        changes: &[Renumbering],
        belongs: impl Fn(&T) -> bool,
        position_of: impl Fn(&mut T) -> &mut kanban_domain::Position,
    ) -> bool {
        let current = changes.iter().all(|change| {
            rows.get_mut(&change.id)
                .filter(|row| belongs(row))
                .map_or(false, |row| *position_of(row) == change.from)
        });
        if !current {
            return false;
        }
        for change in changes {
            if let Some(row) = rows.get_mut(&change.id) {
                *position_of(row) = change.to;
            }
        }
        true
    }
}

#[async_trait]
impl RepositoryTx for MemoryTx {
    async fn board(&mut self, id: BoardId) -> KanbanResult<Option<Board>> {
        Ok(self.view.boards.get(&id).cloned())
    }

    async fn boards(&mut self) -> KanbanResult<Vec<Board>> {
        Ok(self.view.boards.values().cloned().collect())
    }

    async fn list(&mut self, id: ListId) -> KanbanResult<Option<List>> {
        Ok(self.view.lists.get(&id).cloned())
    }

    async fn lists_in_board(&mut self, board_id: BoardId) -> KanbanResult<Vec<List>> {
        Ok(self
            .view
            .lists
            .values()
            .filter(|l| l.board_id == board_id)
            .cloned()
            .collect())
    }

    async fn card(&mut self, id: CardId) -> KanbanResult<Option<Card>> {
        Ok(self.view.cards.get(&id).cloned())
    }

    async fn cards_in_list(&mut self, list_id: ListId) -> KanbanResult<Vec<Card>> {
        Ok(self
            .view
            .cards
            .values()
            .filter(|c| c.list_id == list_id)
            .cloned()
            .collect())
    }

    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()> {
        if self.view.boards.contains_key(&board.id) {
            return Err(KanbanError::Validation(format!("board {} already exists", board.id)));
        }
        self.view.boards.insert(board.id, board.clone());
        self.dirty = true;
        Ok(())
    }

    async fn insert_list(&mut self, list: &List) -> KanbanResult<()> {
        if self.view.lists.contains_key(&list.id) {
            return Err(KanbanError::Validation(format!("list {} already exists", list.id)));
        }
        self.view.lists.insert(list.id, list.clone());
        self.dirty = true;
        Ok(())
    }

    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()> {
        if self.view.cards.contains_key(&card.id) {
            return Err(KanbanError::Validation(format!("card {} already exists", card.id)));
        }
        self.view.cards.insert(card.id, card.clone());
        self.dirty = true;
        Ok(())
    }

    async fn update_board(&mut self, board: &Board, expected_archived: bool) -> KanbanResult<bool> {
        match self.view.boards.get_mut(&board.id) {
            Some(row) if row.archived == expected_archived => {
                *row = board.clone();
                self.dirty = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_list(&mut self, list: &List, expected: ListState) -> KanbanResult<bool> {
        match self.view.lists.get_mut(&list.id) {
            Some(row) if row.state() == expected => {
                *row = list.clone();
                self.dirty = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_card(&mut self, card: &Card, expected: CardState) -> KanbanResult<bool> {
        match self.view.cards.get_mut(&card.id) {
            Some(row) if row.state() == expected => {
                *row = card.clone();
                self.dirty = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn renumber_lists(
        &mut self,
        board_id: BoardId,
        changes: &[Renumbering],
    ) -> KanbanResult<bool> {
        let applied = Self::renumber(
            &mut self.view.lists,
            changes,
            |l| l.board_id == board_id && !l.archived,
            |l| &mut l.position,
        );
        self.dirty |= applied;
        Ok(applied)
    }

    async fn renumber_cards(
        &mut self,
        list_id: ListId,
        changes: &[Renumbering],
    ) -> KanbanResult<bool> {
        let applied = Self::renumber(
            &mut self.view.cards,
            changes,
            |c| c.list_id == list_id && !c.archived,
            |c| &mut c.position,
        );
        self.dirty |= applied;
        Ok(applied)
    }

    async fn commit(&mut self) -> KanbanResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.view.check_unique_positions()?;
        if let Some(backing) = &self.backing {
            backing.save(&self.view.snapshot()).await?;
        }
        *self.guard = self.view.clone();
        self.dirty = false;
        Ok(())
    }
}
