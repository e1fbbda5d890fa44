//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentChunk, QueryResult};

/// Trait for vector storage and nearest-neighbour search over one collection
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert chunks, replacing any with the same id
    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<usize>;

    /// Closest chunks to the query vector, by ascending cosine distance
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryResult>>;

    /// Delete all chunks of a source document
    async fn delete_by_source(&self, source_document_name: &str) -> Result<usize>;

    /// Drop every chunk and the recorded embedding model
    async fn reset(&self) -> Result<()>;

    /// Get total number of chunks stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Distinct source document names
    async fn sources(&self) -> Result<Vec<String>>;

    /// Fail unless the collection was built with this model and dimensionality
    ///
    /// An empty collection adopts the given model.
    async fn ensure_model(&self, model: &str, dimensions: usize) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
