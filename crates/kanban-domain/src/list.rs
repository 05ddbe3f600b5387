use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::position::Position;

pub type ListId = Uuid;

/// Ordered container of cards. `board_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board_id: BoardId,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of a list a conditional write is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListState {
    pub position: Position,
    pub archived: bool,
}

impl List {
    pub fn new(board_id: BoardId, name: String, position: Position) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            board_id,
            name,
            position,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> ListState {
        ListState {
            position: self.position,
            archived: self.archived,
        }
    }

    pub fn update_position(&mut self, position: Position) {
        self.position = position;
        self.updated_at = Utc::now();
    }

    pub fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        !self.archived
    }
}
