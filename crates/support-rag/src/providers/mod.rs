//! Provider abstractions for embeddings, generation and vector storage
//!
//! Trait-based seams that let the pipeline switch between Ollama, Gemini and
//! in-process ONNX backends.

pub mod embedding;
pub mod gemini;
pub mod generation;
pub mod ollama;
#[cfg(feature = "fastembed")]
pub mod onnx;
pub mod vector_store;

use std::sync::Arc;

pub use embedding::EmbeddingProvider;
pub use gemini::{GeminiEmbedder, GeminiGenerator};
pub use generation::GenerationProvider;
pub use ollama::OllamaEmbedder;
#[cfg(feature = "fastembed")]
pub use onnx::FastEmbedder;
pub use vector_store::VectorStoreProvider;

use crate::config::{EmbeddingBackend, EmbeddingConfig, RagConfig};
use crate::error::{Error, Result};

/// Build the embedding provider selected in the configuration
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embeddings = &config.embeddings;
    let provider: Arc<dyn EmbeddingProvider> = match embeddings.provider {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(embeddings)?),
        EmbeddingBackend::Gemini => {
            let api_key = config.generation.api_key.clone().ok_or_else(|| {
                Error::Config("Gemini embeddings require GOOGLE_API_KEY".to_string())
            })?;
            Arc::new(GeminiEmbedder::new(
                &config.generation.base_url,
                api_key,
                embeddings,
            )?)
        }
        EmbeddingBackend::FastEmbed => local_embedder(embeddings)?,
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        dimensions = provider.dimensions(),
        "Embedding provider ready"
    );
    Ok(provider)
}

#[cfg(feature = "fastembed")]
fn local_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(FastEmbedder::new(config)?))
}

#[cfg(not(feature = "fastembed"))]
fn local_embedder(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(Error::Config(
        "embeddings.provider = \"fastembed\" requires building with the `fastembed` feature"
            .to_string(),
    ))
}

/// Primary and optional secondary generators, or none without an API key
pub fn generators_from_config(
    config: &RagConfig,
) -> Result<(Option<Arc<dyn GenerationProvider>>, Option<Arc<dyn GenerationProvider>>)> {
    let Some(api_key) = config.generation.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        tracing::warn!("GOOGLE_API_KEY not set, answers will use document search only");
        return Ok((None, None));
    };

    let generation = &config.generation;
    let primary: Arc<dyn GenerationProvider> = Arc::new(GeminiGenerator::new(
        generation,
        api_key.clone(),
        &generation.primary_model,
    )?);
    let secondary = match &generation.secondary_model {
        Some(model) if !model.trim().is_empty() => {
            let generator: Arc<dyn GenerationProvider> =
                Arc::new(GeminiGenerator::new(generation, api_key, model)?);
            Some(generator)
        }
        _ => None,
    };

    Ok((Some(primary), secondary))
}
