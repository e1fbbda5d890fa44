//! Gemini clients for answer generation and embeddings
//!
//! Both talk to the Generative Language REST API with an API key sent in the
//! `x-goog-api-key` header.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, GenerationConfig};
use crate::error::{Error, GenerationError, Result};

use super::embedding::EmbeddingProvider;
use super::generation::GenerationProvider;

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationParams,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationParams {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate, or why there is none
    fn into_text(self) -> std::result::Result<String, GenerationError> {
        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            GenerationError::Malformed {
                message: "response has no candidates".to_string(),
            }
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::Malformed {
                message: format!(
                    "empty candidate (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        Ok(text.trim().to_string())
    }
}

/// One Gemini model used for answer generation
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiGenerator {
    /// Create a generator for `model`
    pub fn new(config: &GenerationConfig, api_key: String, model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is required".to_string()));
        }
        if model.trim().is_empty() {
            return Err(Error::Config("Model name cannot be empty".to_string()));
        }

        Ok(Self {
            client: build_client(config.timeout())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            timeout: config.timeout(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn handle_response(
        &self,
        response: Response,
    ) -> std::result::Result<String, GenerationError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::from_reqwest_error(&e, self.timeout))?;

        if !status.is_success() {
            return Err(GenerationError::from_status_and_body(status.as_u16(), &body));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::Malformed {
                message: format!("Failed to parse response: {}", e),
            })?;
        parsed.into_text()
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "Calling Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::from_reqwest_error(&e, self.timeout))?;

        self.handle_response(response).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Gemini embedContent provider (text-embedding-004)
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(base_url: &str, api_key: String, config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout())?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model_name().to_string(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let request = EmbedContentRequest {
            content: Content {
                role: "user",
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Gemini embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let classified = GenerationError::from_status_and_body(status, &body);
            tracing::error!(model = %self.model, status, error = %classified, "Gemini embedding failed");
            return Err(Error::embedding(classified.to_string()));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        let values = parsed.embedding.values;
        if values.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: values.len(),
            });
        }
        Ok(values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
