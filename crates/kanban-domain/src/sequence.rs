//! Ordered sibling sequences and insertion-point resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::card::Card;
use crate::list::List;
use crate::position::Position;

/// Where a moving entity should land among its new siblings.
///
/// Sibling indexes never count the moving entity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPoint {
    Before(Uuid),
    After(Uuid),
    AtIndex(usize),
    End,
}

/// A sibling as seen by the allocator: identity plus position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: Uuid,
    pub position: Position,
}

/// The two siblings an insertion lands between. `None` means the sequence
/// edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Neighbors {
    pub prev: Option<Anchor>,
    pub next: Option<Anchor>,
}

/// Anything ordered inside a container.
pub trait Ordered {
    fn id(&self) -> Uuid;
    fn position(&self) -> Position;
    fn created_at(&self) -> DateTime<Utc>;
    fn is_archived(&self) -> bool;

    fn anchor(&self) -> Anchor {
        Anchor {
            id: self.id(),
            position: self.position(),
        }
    }
}

impl Ordered for List {
    fn id(&self) -> Uuid {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

impl Ordered for Card {
    fn id(&self) -> Uuid {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_archived(&self) -> bool {
        self.archived
    }
}

/// Sorts by position, then creation time, then id.
pub fn sort_members<T: Ordered>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.position()
            .cmp(&b.position())
            .then_with(|| a.created_at().cmp(&b.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    });
}

/// Drops archived members (and `exclude`, if given) and sorts the rest.
pub fn active_sorted<T: Ordered>(mut items: Vec<T>, exclude: Option<Uuid>) -> Vec<T> {
    items.retain(|item| !item.is_archived() && Some(item.id()) != exclude);
    sort_members(&mut items);
    items
}

pub fn anchors<T: Ordered>(items: &[T]) -> Vec<Anchor> {
    items.iter().map(Ordered::anchor).collect()
}

impl Neighbors {
    /// Neighbors for appending after `last`.
    pub fn after(last: Option<Position>) -> Self {
        Self {
            prev: last.map(|position| Anchor {
                id: Uuid::nil(),
                position,
            }),
            next: None,
        }
    }

    /// Resolves `point` against the ordered `siblings`.
    ///
    /// Fails with a description when an anchor is not among the siblings or
    /// the index is past the end.
    pub fn resolve(siblings: &[Anchor], point: &InsertionPoint) -> Result<Self, String> {
        let index_of = |id: Uuid| {
            siblings
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| format!("{} is not an active sibling in the destination", id))
        };

        let insert_at = match *point {
            InsertionPoint::Before(id) => index_of(id)?,
            InsertionPoint::After(id) => index_of(id)? + 1,
            InsertionPoint::AtIndex(index) => {
                if index > siblings.len() {
                    return Err(format!(
                        "index {} is past the end of a sequence of {}",
                        index,
                        siblings.len()
                    ));
                }
                index
            }
            InsertionPoint::End => siblings.len(),
        };

        Ok(Self {
            prev: insert_at.checked_sub(1).map(|i| siblings[i]),
            next: siblings.get(insert_at).copied(),
        })
    }

    /// Confirms these neighbors still exist, unchanged, and still border each
    /// other in a freshly read `siblings` sequence.
    pub fn verify(&self, siblings: &[Anchor]) -> Result<(), String> {
        let locate = |anchor: &Anchor| {
            siblings
                .iter()
                .position(|s| s == anchor)
                .ok_or_else(|| format!("neighbor {} moved or was archived", anchor.id))
        };

        let prev_index = self.prev.as_ref().map(locate).transpose()?;
        let next_index = self.next.as_ref().map(locate).transpose()?;

        let bordering = match (prev_index, next_index) {
            (Some(p), Some(n)) => n == p + 1,
            (Some(p), None) => p + 1 == siblings.len(),
            (None, Some(n)) => n == 0,
            (None, None) => siblings.is_empty(),
        };

        if bordering {
            Ok(())
        } else {
            Err("neighbors no longer border each other".to_string())
        }
    }

    /// Whether `position` already sits strictly between these neighbors.
    pub fn contains(&self, position: Position) -> bool {
        self.prev.map_or(true, |p| p.position < position)
            && self.next.map_or(true, |n| position < n.position)
    }
}
