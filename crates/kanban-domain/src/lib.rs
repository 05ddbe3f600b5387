//! Ordering and move engine for boards, lists and cards.
//!
//! Lists are ordered within a board and cards within a list by sparse
//! [`Position`] keys. Every mutation goes through [`OrderingEngine`], which
//! validates against a fresh read and writes conditionally through a
//! [`ContainerRepository`].

pub mod board;
pub mod card;
pub mod engine;
pub mod list;
pub mod normalize;
pub mod position;
pub mod registry;
pub mod repository;
pub mod sequence;
pub mod sweep;
pub mod validation;

pub use board::{Board, BoardId};
pub use card::{Card, CardDraft, CardId, CardState};
pub use engine::{MoveOutcome, OrderingEngine};
pub use list::{List, ListId, ListState};
pub use normalize::{needs_renumbering, plan_renumbering, ContainerKind, RenumberReport};
pub use position::{is_fragmented, AllocationError, Position, PositionAllocator};
pub use repository::{ContainerRepository, Renumbering, RepositoryTx};
pub use sequence::{active_sorted, Anchor, InsertionPoint, Neighbors, Ordered};
pub use sweep::{spawn_configured_sweeper, spawn_sweeper, SweepHandle};
pub use validation::{AuthorizedCardMove, AuthorizedListMove};
