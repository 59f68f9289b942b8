use crate::traits::IndexIngestor;
use crate::{Chunk, IndexError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-process index store. Keeps chunks in memory, keyed by index id.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndexStore {
    ids_by_name: Arc<RwLock<HashMap<String, String>>>,
    chunks_by_id: Arc<RwLock<HashMap<String, Vec<Chunk>>>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn index_names(&self) -> Vec<String> {
        let mut names = self.ids_by_name.read().await.keys().cloned().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub async fn chunks(&self, index_id: &str) -> Vec<Chunk> {
        self.chunks_by_id
            .read()
            .await
            .get(index_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IndexIngestor for MemoryIndexStore {
    async fn create_or_get_index(&self, name: &str) -> Result<String, IndexError> {
        let mut ids = self.ids_by_name.write().await;
        if let Some(id) = ids.get(name) {
            return Ok(id.clone());
        }

        let id = Uuid::new_v4().to_string();
        ids.insert(name.to_string(), id.clone());
        self.chunks_by_id.write().await.insert(id.clone(), Vec::new());
        debug!(index = name, id = %id, "created in-memory index");
        Ok(id)
    }

    async fn add_chunks(&self, index_id: &str, chunks: &[Chunk]) -> Result<(), IndexError> {
        let mut stored = self.chunks_by_id.write().await;
        let Some(existing) = stored.get_mut(index_id) else {
            return Err(IndexError::Request(format!("unknown index id {index_id}")));
        };
        existing.extend_from_slice(chunks);
        Ok(())
    }
}
