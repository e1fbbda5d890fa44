//! Source documents and the chunks they are split into

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
}

impl FileType {
    /// Detect file type from extension; `None` for anything the pipeline ignores
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Markdown => "markdown",
        }
    }
}

/// A chunk of a source document with its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Deterministic id, see [`chunk_id`]
    pub chunk_id: String,
    /// File name of the document the chunk came from
    pub source_document_name: String,
    /// Chunk text
    pub text: String,
    /// Embedding vector
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Position of the chunk inside its document
    pub chunk_index: u32,
    pub file_type: FileType,
    /// SHA-256 of the whole extracted document text
    pub content_hash: String,
}

impl DocumentChunk {
    pub fn new(
        source_document_name: impl Into<String>,
        chunk_index: u32,
        text: impl Into<String>,
        file_type: FileType,
        content_hash: impl Into<String>,
    ) -> Self {
        let source_document_name = source_document_name.into();
        let text = text.into();
        Self {
            chunk_id: chunk_id(&source_document_name, chunk_index, &text),
            source_document_name,
            text,
            embedding: Vec::new(),
            chunk_index,
            file_type,
            content_hash: content_hash.into(),
        }
    }

    /// Set embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Derive a chunk id from its source, position and text
///
/// Identical content always maps to the same id, so re-ingesting a document
/// overwrites its chunks instead of duplicating them.
pub fn chunk_id(source_document_name: &str, chunk_index: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_document_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk_index.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

/// SHA-256 hex digest of a document's text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
