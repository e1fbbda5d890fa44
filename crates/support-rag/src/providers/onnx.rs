//! Local ONNX embeddings through fastembed
//!
//! The model is downloaded into the fastembed cache on first use and runs
//! in-process, so ingestion and retrieval need no embedding server.

use std::str::FromStr;
use std::sync::Arc;

use ::fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// In-process embedder backed by fastembed's `TextEmbedding`
pub struct FastEmbedder {
    model: String,
    dimensions: usize,
    inner: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load the configured model; the Ollama default maps to BGE small
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let embedding_model = if config.uses_default_model() {
            EmbeddingModel::BGESmallENV15
        } else {
            EmbeddingModel::from_str(config.model.trim()).map_err(|e| {
                Error::Config(format!("unknown fastembed model '{}': {}", config.model, e))
            })?
        };

        let info = TextEmbedding::get_model_info(&embedding_model).map_err(|e| {
            Error::Config(format!("no metadata for fastembed model: {}", e))
        })?;
        let model = info.model_code.clone();
        let dimensions = info.dim;

        let text_embedding = TextEmbedding::try_new(TextInitOptions::new(embedding_model))
            .map_err(|e| Error::embedding(format!("failed to load {}: {}", model, e)))?;

        tracing::info!(model = %model, dimensions, "fastembed model loaded");
        Ok(Self {
            model,
            dimensions,
            inner: Arc::new(Mutex::new(text_embedding)),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("fastembed returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut embedder = inner.lock();
            embedder.embed(texts, None)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
        .map_err(|e| Error::embedding(format!("fastembed inference failed: {}", e)))?;

        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }
        Ok(embeddings)
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
        "fastembed"
    }
}
