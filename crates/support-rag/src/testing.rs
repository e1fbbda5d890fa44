//! Scripted providers and fixtures shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::{Error, GenerationError, Result};
use crate::providers::{EmbeddingProvider, GenerationProvider, VectorStoreProvider};
use crate::storage::SqliteVectorStore;
use crate::types::{DocumentChunk, FileType};

/// Deterministic embedder: texts score as similar when they share words
pub struct HashingEmbedder {
    model: String,
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.clamp(8, 4096);
        Self {
            model: format!("token-hash-{}", dimensions),
            dimensions,
        }
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    /// Bucket index from the first eight bytes of the token's SHA-256
    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % self.dimensions as u64) as usize
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in Self::tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("embedding service unreachable"))
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn model(&self) -> &str {
        "failing"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Generator that replays a fixed list of outcomes, then repeats the last one
pub struct ScriptedGenerator {
    model: String,
    script: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(
        model: &str,
        script: Vec<std::result::Result<String, GenerationError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            script: Mutex::new(script.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(model: &str, text: &str) -> Arc<Self> {
        Self::new(model, vec![Ok(text.to_string())])
    }

    pub fn failing(model: &str, error: GenerationError) -> Arc<Self> {
        Self::new(model, vec![Err(error)])
    }

    /// Generator that sleeps before answering
    pub fn hanging(model: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            script: Mutex::new(vec![Ok("too late".to_string())].into()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// In-memory store holding one chunk per `(source, text)` pair
pub async fn seeded_store(
    embedder: &dyn EmbeddingProvider,
    docs: &[(&str, &str)],
) -> Arc<SqliteVectorStore> {
    let store = SqliteVectorStore::in_memory("fixture").unwrap();
    store
        .ensure_model(embedder.model(), embedder.dimensions())
        .await
        .unwrap();

    let mut chunks = Vec::new();
    for (source, text) in docs {
        let embedding = embedder.embed(text).await.unwrap();
        chunks.push(DocumentChunk::new(*source, 0, *text, FileType::Txt, "fixture").with_embedding(embedding));
    }
    store.upsert(&chunks).await.unwrap();
    Arc::new(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("The refund window is 30 days.").await.unwrap();
        let b = embedder.embed("the REFUND window is 30 days").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("What is the refund window?").await.unwrap();
        let related = embedder.embed("The refund window is 30 days.").await.unwrap();
        let unrelated = embedder.embed("Shipping labels print in color.").await.unwrap();
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }
}
