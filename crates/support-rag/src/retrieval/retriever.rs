//! Retriever: embeds a question and asks the vector store for the closest chunks

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::QueryResult;

/// Top-K retrieval over one collection
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStoreProvider>) -> Self {
        Self { embedder, store }
    }

    /// Chunks closest to `query`, at most `k`, by non-decreasing distance
    ///
    /// Embedding failures are returned to the caller; an empty collection
    /// yields an empty result.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let vector = self.embedder.embed(query).await.map_err(|e| {
            tracing::error!(provider = self.embedder.name(), error = %e, "Query embedding failed");
            e
        })?;

        let results = self.store.query(&vector, k).await?;

        tracing::debug!(
            k,
            hits = results.len(),
            best_distance = results.first().map(|r| r.distance),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Retrieved chunks"
        );
        Ok(results)
    }
}
