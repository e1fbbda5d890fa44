//! Ollama embedding provider with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model_name().to_string(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                        tracing::warn!(
                            "Embedding request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::embedding("Unknown error")))
    }

    /// One `/api/embeddings` round trip; the only part that is retried
    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Ollama embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;
        Ok(embed_response.embedding)
    }

    fn check_dimensions(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
        if embedding.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.retry_request(|| self.request_embedding(text)).await?;
        self.check_dimensions(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_error() {
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            max_retries: 0,
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(!embedder.health_check().await.unwrap());
        assert_eq!(embedder.model(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_wrong_dimensions_not_retried() {
        let config = EmbeddingConfig {
            dimensions: 4,
            max_retries: 3,
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let embedding = embedder
            .retry_request(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![0.5f32; 3])
            })
            .await
            .unwrap();
        let err = embedder.check_dimensions(embedding).unwrap_err();

        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_failures_are_retried() {
        let config = EmbeddingConfig {
            max_retries: 1,
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: Result<Vec<f32>> = embedder
            .retry_request(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::embedding("connection refused"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
