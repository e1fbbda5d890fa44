//! Query request and retrieval result types

use serde::{Deserialize, Serialize};

/// A retrieved chunk and its distance from the query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub chunk_id: String,
    pub source_document_name: String,
    pub text: String,
    /// Cosine distance `1 - cos(a, b)`, in `[0, 2]`
    pub distance: f32,
}

/// Stateless question request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (defaults to the configured top_k)
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
        }
    }

    /// Set top_k
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Chat message request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// Ingestion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Drop the whole collection before ingesting
    #[serde(default)]
    pub recreate: bool,
}
