use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::list::ListId;
use crate::position::Position;

pub type CardId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub position: Position,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of a card a conditional write is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardState {
    pub list_id: ListId,
    pub position: Position,
    pub archived: bool,
}

/// Caller-supplied fields for a new card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
}

impl CardDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn created_by(mut self, user: Uuid) -> Self {
        self.created_by = Some(user);
        self
    }
}

impl Card {
    pub fn new(list_id: ListId, draft: CardDraft, position: Position) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            list_id,
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            position,
            archived: false,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> CardState {
        CardState {
            list_id: self.list_id,
            position: self.position,
            archived: self.archived,
        }
    }

    pub fn move_to_list(&mut self, list_id: ListId, position: Position) {
        self.list_id = list_id;
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
