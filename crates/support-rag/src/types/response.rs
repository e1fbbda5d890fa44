//! Answer, ingestion and status response types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where an answer came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerSource {
    /// Composed by the primary model
    AiEnhanced,
    /// Composed by the secondary model after the primary failed
    AiEnhancedSecondary,
    /// Raw excerpts from the retrieved chunks
    DocumentSearchOnly,
    /// Nothing relevant was retrieved
    NoResults,
    /// The question could not be embedded or searched
    RetrievalFailed,
}

impl AnswerSource {
    /// Human-readable tag shown next to an answer
    pub fn label(&self) -> &'static str {
        match self {
            Self::AiEnhanced => "ai-enhanced",
            Self::AiEnhancedSecondary => "ai-enhanced (secondary)",
            Self::DocumentSearchOnly => "document-search-only",
            Self::NoResults => "no-results",
            Self::RetrievalFailed => "retrieval-failed",
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::AiEnhanced | Self::AiEnhancedSecondary)
    }
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one remote generation call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { kind: String, message: String },
}

/// One remote generation call made while composing an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptRecord {
    pub model: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }
}

/// Final answer with its provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedAnswer {
    pub text: String,
    pub source: AnswerSource,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

impl ComposedAnswer {
    pub fn new(text: impl Into<String>, source: AnswerSource) -> Self {
        Self {
            text: text.into(),
            source,
            attempts: Vec::new(),
        }
    }
}

/// Wire form of an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub source: AnswerSource,
    pub label: String,
    pub attempts: Vec<AttemptRecord>,
    /// Turns in the session after this exchange (chat only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_len: Option<usize>,
}

impl From<ComposedAnswer> for AnswerResponse {
    fn from(answer: ComposedAnswer) -> Self {
        Self {
            label: answer.source.label().to_string(),
            answer: answer.text,
            source: answer.source,
            attempts: answer.attempts,
            history_len: None,
        }
    }
}

/// A file the pipeline could not ingest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Files visited in the directory tree
    pub files_seen: usize,
    pub files_ingested: usize,
    /// Files with an unsupported extension
    pub ignored: usize,
    pub skipped: Vec<SkippedFile>,
    pub chunks_written: usize,
    /// Sources dropped because their file is gone from the directory
    #[serde(default)]
    pub sources_removed: usize,
    pub processing_time_ms: u64,
}

impl IngestReport {
    pub fn skip(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.skipped.push(SkippedFile {
            path: path.into(),
            reason: reason.into(),
        });
    }
}

/// Embedder health summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderStatus {
    pub name: String,
    pub model: String,
    pub healthy: bool,
}

/// Vector store summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbStatus {
    pub name: String,
    pub collection: String,
    pub chunks: usize,
    pub documents: usize,
}

/// Operating mode derived from the wired generators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AssistantMode {
    AiWithFallback,
    DocumentSearchOnly,
}

/// Health and configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub api_key_present: bool,
    pub embedder: EmbedderStatus,
    pub vector_db: VectorDbStatus,
    pub primary_model: String,
    pub secondary_model: Option<String>,
    pub mode: AssistantMode,
}
