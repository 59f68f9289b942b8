use crate::{Chunk, IndexError};
use async_trait::async_trait;

/// Capability offered by the retrieval store. Embedding and persistence are
/// the store's business; the pipeline only names indexes and hands over
/// chunks.
#[async_trait]
pub trait IndexIngestor {
    /// Returns the id of the index called `name`, creating it on first use.
    async fn create_or_get_index(&self, name: &str) -> Result<String, IndexError>;

    async fn add_chunks(&self, index_id: &str, chunks: &[Chunk]) -> Result<(), IndexError>;
}
