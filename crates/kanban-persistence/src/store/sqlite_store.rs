use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Board, BoardId, Card, CardId, CardState, ContainerRepository, List, ListId, ListState,
    Position, Renumbering, RepositoryTx,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, SqliteConnection, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../schema.sql");
const MEMORY_PATH: &str = ":memory:";

// SQLITE_BUSY, SQLITE_LOCKED and their extended codes: another connection
// holds or has just committed a conflicting write.
const BUSY_CODES: &[&str] = &["5", "6", "261", "517"];

/// Maps a driver error onto the store error taxonomy.
fn db_error(e: sqlx::Error) -> KanbanError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return KanbanError::UniqueViolation(db.message().to_string());
        }
        if db.code().is_some_and(|code| BUSY_CODES.contains(&code.as_ref())) {
            return KanbanError::Conflict(db.message().to_string());
        }
    }
    KanbanError::Database(e.to_string())
}

fn parse_uuid(value: &str) -> KanbanResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| KanbanError::Serialization(e.to_string()))
}

fn parse_time(value: &str) -> KanbanResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| KanbanError::Serialization(e.to_string()))?
        .with_timezone(&Utc))
}

fn row_to_board(row: &SqliteRow) -> KanbanResult<Board> {
    let tenant_id: Option<String> = row.try_get("tenant_id").map_err(db_error)?;
    Ok(Board {
        id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_error)?)?,
        name: row.try_get("name").map_err(db_error)?,
        tenant_id: tenant_id.as_deref().map(parse_uuid).transpose()?,
        archived: row.try_get("archived").map_err(db_error)?,
        created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(db_error)?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(db_error)?)?,
    })
}

fn row_to_list(row: &SqliteRow) -> KanbanResult<List> {
    Ok(List {
        id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_error)?)?,
        board_id: parse_uuid(&row.try_get::<String, _>("board_id").map_err(db_error)?)?,
        name: row.try_get("name").map_err(db_error)?,
        position: Position::new(row.try_get("position").map_err(db_error)?),
        archived: row.try_get("archived").map_err(db_error)?,
        created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(db_error)?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(db_error)?)?,
    })
}

fn row_to_card(row: &SqliteRow) -> KanbanResult<Card> {
    let due_date: Option<String> = row.try_get("due_date").map_err(db_error)?;
    let created_by: Option<String> = row.try_get("created_by").map_err(db_error)?;
    Ok(Card {
        id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_error)?)?,
        list_id: parse_uuid(&row.try_get::<String, _>("list_id").map_err(db_error)?)?,
        title: row.try_get("title").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        due_date: due_date.as_deref().map(parse_time).transpose()?,
        position: Position::new(row.try_get("position").map_err(db_error)?),
        archived: row.try_get("archived").map_err(db_error)?,
        created_by: created_by.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(db_error)?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(db_error)?)?,
    })
}

const BOARD_COLUMNS: &str = "id, name, tenant_id, archived, created_at, updated_at";
const LIST_COLUMNS: &str = "id, board_id, name, position, archived, created_at, updated_at";
const CARD_COLUMNS: &str = "id, list_id, title, description, due_date, position, archived, \
                            created_by, created_at, updated_at";

/// SQLite-backed repository. Each engine transaction is a database
/// transaction; partial unique indexes enforce distinct active positions.
pub struct SqliteStore {
    path: PathBuf,
    pool: tokio::sync::OnceCell<Pool<Sqlite>>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pool: tokio::sync::OnceCell::new(),
        }
    }

    /// A private in-memory database, mostly for tests.
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn get_pool(&self) -> KanbanResult<&Pool<Sqlite>> {
        self.pool
            .get_or_try_init(|| async {
                let in_memory = self.path == Path::new(MEMORY_PATH);
                let url = if in_memory {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite://{}?mode=rwc", self.path.display())
                };

                let mut options = SqliteConnectOptions::from_str(&url)
                    .map_err(db_error)?
                    .create_if_missing(true)
                    .foreign_keys(true)
                    .busy_timeout(Duration::from_secs(5));
                if !in_memory {
                    options = options.journal_mode(SqliteJournalMode::Wal);
                }

                // An in-memory database lives and dies with its only connection
                let mut pool_options = SqlitePoolOptions::new();
                pool_options = if in_memory {
                    pool_options
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    pool_options.max_connections(5)
                };
                let pool = pool_options.connect_with(options).await.map_err(db_error)?;

                // Initialize schema
                sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(db_error)?;

                tracing::info!("Opened SQLite database at {}", self.path.display());
                Ok(pool)
            })
            .await
    }
}

#[async_trait]
impl ContainerRepository for SqliteStore {
    async fn begin(&self) -> KanbanResult<Box<dyn RepositoryTx>> {
        let tx = self.get_pool().await?.begin().await.map_err(db_error)?;
        Ok(Box::new(SqliteTx { tx: Some(tx) }))
    }
}

struct SqliteTx {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTx {
    fn conn(&mut self) -> KanbanResult<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| KanbanError::Internal("transaction already committed".to_string()))
    }
}

/// Rewrites positions of the active rows under `parent` in two passes so the
/// unique index never sees a transient duplicate: changed rows first move to
/// distinct negatives below every current position, then to their targets.
async fn renumber(
    conn: &mut SqliteConnection,
    table: &str,
    parent_column: &str,
    parent: Uuid,
    changes: &[Renumbering],
) -> KanbanResult<bool> {
    if changes.is_empty() {
        return Ok(true);
    }
    let parent = parent.to_string();

    let max_abs: Option<f64> = sqlx::query_scalar(&format!(
        "SELECT MAX(ABS(position)) FROM {table} WHERE {parent_column} = ? AND archived = 0"
    ))
    .bind(&parent)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error)?;
    let floor = max_abs.unwrap_or(0.0) + 1.0;

    let park = format!(
        "UPDATE {table} SET position = ? \
         WHERE id = ? AND {parent_column} = ? AND position = ? AND archived = 0"
    );
    for (i, change) in changes.iter().enumerate() {
        let affected = sqlx::query(&park)
            .bind(-(floor + i as f64))
            .bind(change.id.to_string())
            .bind(&parent)
            .bind(change.from.value())
            .execute(&mut *conn)
            .await
            .map_err(db_error)?
            .rows_affected();
        if affected != 1 {
            return Ok(false);
        }
    }

    let place = format!("UPDATE {table} SET position = ? WHERE id = ?");
    for change in changes {
        sqlx::query(&place)
            .bind(change.to.value())
            .bind(change.id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }
    Ok(true)
}

#[async_trait]
impl RepositoryTx for SqliteTx {
    async fn board(&mut self, id: BoardId) -> KanbanResult<Option<Board>> {
        sqlx::query(&format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_board)
            .transpose()
    }

    async fn boards(&mut self) -> KanbanResult<Vec<Board>> {
        sqlx::query(&format!("SELECT {BOARD_COLUMNS} FROM boards"))
            .fetch_all(self.conn()?)
            .await
            .map_err(db_error)?
            .iter()
            .map(row_to_board)
            .collect()
    }

    async fn list(&mut self, id: ListId) -> KanbanResult<Option<List>> {
        sqlx::query(&format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_list)
            .transpose()
    }

    async fn lists_in_board(&mut self, board_id: BoardId) -> KanbanResult<Vec<List>> {
        sqlx::query(&format!("SELECT {LIST_COLUMNS} FROM lists WHERE board_id = ?"))
            .bind(board_id.to_string())
            .fetch_all(self.conn()?)
            .await
            .map_err(db_error)?
            .iter()
            .map(row_to_list)
            .collect()
    }

    async fn card(&mut self, id: CardId) -> KanbanResult<Option<Card>> {
        sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.conn()?)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(row_to_card)
            .transpose()
    }

    async fn cards_in_list(&mut self, list_id: ListId) -> KanbanResult<Vec<Card>> {
        sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE list_id = ?"))
            .bind(list_id.to_string())
            .fetch_all(self.conn()?)
            .await
            .map_err(db_error)?
            .iter()
            .map(row_to_card)
            .collect()
    }

    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()> {
        sqlx::query(&format!(
            "INSERT INTO boards ({BOARD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(board.id.to_string())
        .bind(&board.name)
        .bind(board.tenant_id.map(|id| id.to_string()))
        .bind(board.archived)
        .bind(board.created_at.to_rfc3339())
        .bind(board.updated_at.to_rfc3339())
        .execute(self.conn()?)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn insert_list(&mut self, list: &List) -> KanbanResult<()> {
        sqlx::query(&format!(
            "INSERT INTO lists ({LIST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(list.id.to_string())
        .bind(list.board_id.to_string())
        .bind(&list.name)
        .bind(list.position.value())
        .bind(list.archived)
        .bind(list.created_at.to_rfc3339())
        .bind(list.updated_at.to_rfc3339())
        .execute(self.conn()?)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()> {
        sqlx::query(&format!(
            "INSERT INTO cards ({CARD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(card.id.to_string())
        .bind(card.list_id.to_string())
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.due_date.map(|d| d.to_rfc3339()))
        .bind(card.position.value())
        .bind(card.archived)
        .bind(card.created_by.map(|id| id.to_string()))
        .bind(card.created_at.to_rfc3339())
        .bind(card.updated_at.to_rfc3339())
        .execute(self.conn()?)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_board(&mut self, board: &Board, expected_archived: bool) -> KanbanResult<bool> {
        let affected = sqlx::query(
            "UPDATE boards SET name = ?, tenant_id = ?, archived = ?, updated_at = ?
             WHERE id = ? AND archived = ?",
        )
        .bind(&board.name)
        .bind(board.tenant_id.map(|id| id.to_string()))
        .bind(board.archived)
        .bind(board.updated_at.to_rfc3339())
        .bind(board.id.to_string())
        .bind(expected_archived)
        .execute(self.conn()?)
        .await
        .map_err(db_error)?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn update_list(&mut self, list: &List, expected: ListState) -> KanbanResult<bool> {
        let affected = sqlx::query(
            "UPDATE lists SET name = ?, position = ?, archived = ?, updated_at = ?
             WHERE id = ? AND position = ? AND archived = ?",
        )
        .bind(&list.name)
        .bind(list.position.value())
        .bind(list.archived)
        .bind(list.updated_at.to_rfc3339())
        .bind(list.id.to_string())
        .bind(expected.position.value())
        .bind(expected.archived)
        .execute(self.conn()?)
        .await
        .map_err(db_error)?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn update_card(&mut self, card: &Card, expected: CardState) -> KanbanResult<bool> {
        let affected = sqlx::query(
            "UPDATE cards SET list_id = ?, title = ?, description = ?, due_date = ?,
                position = ?, archived = ?, updated_at = ?
             WHERE id = ? AND list_id = ? AND position = ? AND archived = ?",
        )
        .bind(card.list_id.to_string())
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.due_date.map(|d| d.to_rfc3339()))
        .bind(card.position.value())
        .bind(card.archived)
        .bind(card.updated_at.to_rfc3339())
        .bind(card.id.to_string())
        .bind(expected.list_id.to_string())
        .bind(expected.position.value())
        .bind(expected.archived)
        .execute(self.conn()?)
        .await
        .map_err(db_error)?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn renumber_lists(
        &mut self,
        board_id: BoardId,
        changes: &[Renumbering],
    ) -> KanbanResult<bool> {
        renumber(self.conn()?, "lists", "board_id", board_id, changes).await
    }

    async fn renumber_cards(
        &mut self,
        list_id: ListId,
        changes: &[Renumbering],
    ) -> KanbanResult<bool> {
        renumber(self.conn()?, "cards", "list_id", list_id, changes).await
    }

    async fn commit(&mut self) -> KanbanResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| KanbanError::Internal("transaction already committed".to_string()))?;
        tx.commit().await.map_err(db_error)
    }
}
