//! Core types for the assistant

pub mod chat;
pub mod document;
pub mod query;
pub mod response;

pub use chat::{ChatRole, ChatTurn};
pub use document::{DocumentChunk, FileType};
pub use query::{AskRequest, IngestRequest, MessageRequest, QueryResult};
pub use response::{
    AnswerResponse, AnswerSource, AssistantMode, AttemptOutcome, AttemptRecord, ComposedAnswer,
    EmbedderStatus, IngestReport, SkippedFile, SystemStatus, VectorDbStatus,
};
