use async_trait::async_trait;
use kanban_core::{AppConfig, KanbanResult};
use kanban_domain::{ContainerRepository, OrderingEngine, RepositoryTx};
use kanban_persistence::{JsonFileStore, MemoryStore};
use std::path::Path;
use std::sync::Arc;

/// Store behind the CLI, picked from the data file's extension.
pub enum Backend {
    Json(MemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(kanban_persistence::SqliteStore),
}

impl Backend {
    pub async fn open(file_path: &str) -> KanbanResult<Self> {
        #[cfg(feature = "sqlite")]
        if is_sqlite_path(Path::new(file_path)) {
            tracing::debug!("Opening {} as SQLite", file_path);
            return Ok(Self::Sqlite(kanban_persistence::SqliteStore::new(file_path)));
        }

        tracing::debug!("Opening {} as JSON", file_path);
        let store = MemoryStore::open(Arc::new(JsonFileStore::new(file_path))).await?;
        Ok(Self::Json(store))
    }
}

#[async_trait]
impl ContainerRepository for Backend {
    async fn begin(&self) -> KanbanResult<Box<dyn RepositoryTx>> {
        match self {
            Self::Json(store) => store.begin().await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(store) => store.begin().await,
        }
    }
}

#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
fn is_sqlite_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    )
}

pub struct CliContext {
    pub engine: Arc<OrderingEngine<Backend>>,
}

impl CliContext {
    pub async fn load(file_path: &str) -> KanbanResult<Self> {
        let config = AppConfig::load();
        let backend = Backend::open(file_path).await?;
        let engine = OrderingEngine::with_config(backend, config.engine)?;
        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}
