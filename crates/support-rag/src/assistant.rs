//! The assembled assistant shared by the CLI and the HTTP server

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::chat::{ChatService, SessionStore};
use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::AnswerComposer;
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::providers::{
    embedder_from_config, generators_from_config, EmbeddingProvider, GenerationProvider,
    VectorStoreProvider,
};
use crate::retrieval::Retriever;
use crate::storage::SqliteVectorStore;
use crate::types::{
    AssistantMode, ComposedAnswer, EmbedderStatus, IngestReport, SystemStatus, VectorDbStatus,
};

/// Cheaply cloneable handle to every component
#[derive(Clone)]
pub struct Assistant {
    inner: Arc<AssistantInner>,
}

struct AssistantInner {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    pipeline: IngestPipeline,
    chat: ChatService,
    sessions: SessionStore,
    /// Whether a primary generator is wired in
    generation: bool,
    /// Held for the whole of an ingestion run
    ingest_lock: Mutex<()>,
}

impl Assistant {
    /// Build providers and open the store named in `config`
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let embedder = embedder_from_config(&config)?;
        let store: Arc<dyn VectorStoreProvider> = Arc::new(SqliteVectorStore::open(
            &config.vector_db.storage_path,
            config.vector_db.collection.as_str(),
        )?);
        let (primary, secondary) = generators_from_config(&config)?;

        tracing::info!(
            store = %config.vector_db.storage_path.display(),
            collection = %config.vector_db.collection,
            generation = primary.is_some(),
            "Assistant initialized"
        );
        Ok(Self::with_components(config, embedder, store, primary, secondary))
    }

    /// Assemble from already built providers
    pub fn with_components(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        primary: Option<Arc<dyn GenerationProvider>>,
        secondary: Option<Arc<dyn GenerationProvider>>,
    ) -> Self {
        let pipeline = IngestPipeline::new(
            TextChunker::from_config(&config.chunking),
            embedder.clone(),
            store.clone(),
        );
        let generation = primary.is_some();
        let composer = AnswerComposer::from_config(&config, primary, secondary);
        let chat = ChatService::new(
            Retriever::new(embedder.clone(), store.clone()),
            composer,
            config.retrieval.top_k,
        );

        Self {
            inner: Arc::new(AssistantInner {
                config,
                embedder,
                store,
                pipeline,
                chat,
                sessions: SessionStore::new(),
                generation,
                ingest_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn chat(&self) -> &ChatService {
        &self.inner.chat
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Ingest the configured documents directory
    pub async fn ingest(&self, recreate: bool) -> Result<IngestReport> {
        let dir = self.inner.config.data.documents_dir.clone();
        self.ingest_dir(&dir, recreate).await
    }

    /// Ingest `dir`; concurrent calls wait for the running one
    pub async fn ingest_dir(&self, dir: &Path, recreate: bool) -> Result<IngestReport> {
        let _guard = self.inner.ingest_lock.lock().await;
        self.inner.pipeline.ingest_directory(dir, recreate).await
    }

    /// Stateless question
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> ComposedAnswer {
        self.inner.chat.answer(question, top_k).await
    }

    pub async fn status(&self) -> Result<SystemStatus> {
        let config = &self.inner.config;
        let embedder = &self.inner.embedder;
        let healthy = embedder.health_check().await.unwrap_or(false);

        let vector_db = VectorDbStatus {
            name: self.inner.store.name().to_string(),
            collection: config.vector_db.collection.clone(),
            chunks: self.inner.store.len().await?,
            documents: self.inner.store.sources().await?.len(),
        };

        let mode = if self.inner.generation {
            AssistantMode::AiWithFallback
        } else {
            AssistantMode::DocumentSearchOnly
        };

        Ok(SystemStatus {
            api_key_present: config.has_api_key(),
            embedder: EmbedderStatus {
                name: embedder.name().to_string(),
                model: embedder.model().to_string(),
                healthy,
            },
            vector_db,
            primary_model: config.generation.primary_model.clone(),
            secondary_model: config.generation.secondary_model.clone(),
            mode,
        })
    }
}
