use crate::store::atomic_writer::AtomicWriter;
use crate::traits::{PersistenceMetadata, PersistenceStore, Snapshot, FORMAT_VERSION};
use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// JSON file-based persistence store
/// Implements the PersistenceStore trait for JSON file operations
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    /// `saved_at` of the file as this instance last saw it.
    last_seen: Mutex<Option<DateTime<Utc>>>,
}

/// Wrapper structure for the JSON file format
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: Snapshot,
}

impl JsonFileStore {
    /// Create a new JSON file store
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    /// Create a new JSON file store with a specific instance ID
    /// (useful for testing or coordinating across instances)
    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            last_seen: Mutex::new(None),
        }
    }

    /// Get the instance ID for this store
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    async fn read_envelope(&self) -> KanbanResult<JsonEnvelope> {
        let file_bytes = AtomicWriter::read_all(&self.path).await?;
        let envelope: JsonEnvelope = serde_json::from_slice(&file_bytes)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;

        if envelope.version != FORMAT_VERSION {
            return Err(KanbanError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl PersistenceStore for JsonFileStore {
    async fn save(&self, snapshot: &Snapshot) -> KanbanResult<PersistenceMetadata> {
        let mut last_seen = self.last_seen.lock().await;

        // Someone else wrote the file since we last loaded or saved it
        let on_disk = if self.exists().await {
            Some(self.read_envelope().await?.metadata.saved_at)
        } else {
            None
        };
        if on_disk.is_some() && on_disk != *last_seen {
            tracing::warn!("{} changed on disk, refusing to overwrite", self.path.display());
            return Err(KanbanError::Conflict(format!(
                "{} was modified by another instance",
                self.path.display()
            )));
        }

        let metadata = PersistenceMetadata::new(self.instance_id);
        let envelope = JsonEnvelope {
            version: FORMAT_VERSION,
            metadata,
            data: snapshot.clone(),
        };

        let json_bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;

        AtomicWriter::write_atomic(&self.path, &json_bytes).await?;
        *last_seen = Some(envelope.metadata.saved_at);

        tracing::info!(
            "Saved {} bytes to {}",
            json_bytes.len(),
            self.path.display()
        );

        Ok(envelope.metadata)
    }

    async fn load(&self) -> KanbanResult<Option<(Snapshot, PersistenceMetadata)>> {
        let mut last_seen = self.last_seen.lock().await;
        if !self.exists().await {
            *last_seen = None;
            return Ok(None);
        }

        let envelope = self.read_envelope().await?;
        *last_seen = Some(envelope.metadata.saved_at);

        tracing::info!("Loaded {}", self.path.display());
        Ok(Some((envelope.data, envelope.metadata)))
    }

    async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
