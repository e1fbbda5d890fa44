//! support-rag: question answering over a folder of support documents
//!
//! Documents are parsed, chunked, embedded and stored in a SQLite-backed
//! vector collection. Questions retrieve the closest chunks and are answered
//! by a primary Gemini model, a secondary model when the primary is out of
//! quota or unavailable, and finally by the raw excerpts themselves.

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

pub use assistant::Assistant;
pub use config::RagConfig;
pub use error::{Error, GenerationError, Result};
pub use types::{AnswerSource, ComposedAnswer, IngestReport, QueryResult, SystemStatus};
