//! Configuration for the support assistant

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main assistant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Source document location
    #[serde(default)]
    pub data: DataConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Remote generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// Apply environment overrides through the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Some(dir) = non_empty("SUPPORT_RAG_DATA_DIR") {
            self.data.documents_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty("SUPPORT_RAG_DB_PATH") {
            self.vector_db.storage_path = PathBuf::from(path);
        }
        if let Some(collection) = non_empty("SUPPORT_RAG_COLLECTION") {
            self.vector_db.collection = collection;
        }
        if let Some(provider) = non_empty("SUPPORT_RAG_EMBEDDING_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "ollama" => self.embeddings.provider = EmbeddingBackend::Ollama,
                "gemini" => self.embeddings.provider = EmbeddingBackend::Gemini,
                "fastembed" => self.embeddings.provider = EmbeddingBackend::FastEmbed,
                other => tracing::warn!(provider = other, "Ignoring unknown embedding provider"),
            }
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".into()));
        }
        if self.generation.timeout_secs == 0 || self.embeddings.timeout_secs == 0 {
            return Err(Error::Config("timeouts must be positive".into()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".into()));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::Config("vector_db.collection must not be empty".into()));
        }
        Ok(())
    }

    /// Whether a remote generation key is configured
    pub fn has_api_key(&self) -> bool {
        self.generation
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Where source documents are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub documents_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("data"),
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Gemini embedContent API
    Gemini,
    /// In-process ONNX model via fastembed (`fastembed` feature)
    #[serde(rename = "fastembed")]
    FastEmbed,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    /// Model to use (nomic-embed-text for Ollama, text-embedding-004 for Gemini)
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Ollama base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for failed embedding requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: DEFAULT_OLLAMA_EMBED_MODEL.to_string(),
            dimensions: 768,
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

const DEFAULT_OLLAMA_EMBED_MODEL: &str = "nomic-embed-text";
const DEFAULT_GEMINI_EMBED_MODEL: &str = "text-embedding-004";

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether the model was left at its default
    pub fn uses_default_model(&self) -> bool {
        self.model == DEFAULT_OLLAMA_EMBED_MODEL
    }

    /// Configured model, with the Ollama default swapped for Gemini's
    pub fn model_name(&self) -> &str {
        match self.provider {
            EmbeddingBackend::Gemini if self.model == DEFAULT_OLLAMA_EMBED_MODEL => {
                DEFAULT_GEMINI_EMBED_MODEL
            }
            _ => &self.model,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 20,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// SQLite file holding the vectors
    pub storage_path: PathBuf,
    /// Collection (partition) name
    pub collection: String,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("support-rag")
            .join("vectors.db");

        Self {
            storage_path,
            collection: "support_docs".to_string(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Characters kept per excerpt in document-only answers
    pub excerpt_chars: usize,
    /// Characters of each chunk sent to the model as context
    pub context_chars_per_chunk: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            excerpt_chars: 500,
            context_chars_per_chunk: 1000,
        }
    }
}

/// Remote generation (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API key; generation is disabled without one
    pub api_key: Option<String>,
    pub base_url: String,
    pub primary_model: String,
    /// Model tried after a quota or transient failure of the primary
    pub secondary_model: Option<String>,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            primary_model: "gemini-1.5-flash".to_string(),
            secondary_model: Some("gemini-1.5-pro".to_string()),
            timeout_secs: 30,
            temperature: 0.3,
            max_output_tokens: 1024,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.vector_db.collection, "support_docs");
        assert_eq!(config.generation.primary_model, "gemini-1.5-flash");
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 400

            [generation]
            secondary_model = "gemini-1.5-flash-8b"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(
            config.generation.secondary_model.as_deref(),
            Some("gemini-1.5-flash-8b")
        );
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GOOGLE_API_KEY", "abc"),
            ("SUPPORT_RAG_COLLECTION", "faq"),
            ("SUPPORT_RAG_EMBEDDING_PROVIDER", "FastEmbed"),
            ("SUPPORT_RAG_DATA_DIR", ""),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.has_api_key());
        assert_eq!(config.vector_db.collection, "faq");
        assert_eq!(config.embeddings.provider, EmbeddingBackend::FastEmbed);
        assert_eq!(config.data.documents_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_embedding_backend_names() {
        let config = RagConfig::from_toml_str(
            r#"
            [embeddings]
            provider = "fastembed"
            "#,
        )
        .unwrap();
        assert_eq!(config.embeddings.provider, EmbeddingBackend::FastEmbed);
        assert!(config.embeddings.uses_default_model());
        assert!(RagConfig::from_toml_str("[embeddings]\nprovider = \"bogus\"").is_err());
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }
}
