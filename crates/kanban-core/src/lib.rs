pub mod config;
pub mod error;
pub mod result;

pub use config::{AppConfig, EngineConfig};
pub use error::{EntityKind, KanbanError, MoveError};
pub use result::{KanbanResult, MoveResult};
