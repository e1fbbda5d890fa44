//! Chat sessions over the document collection

mod service;
mod session;

pub use service::{ChatService, EMPTY_QUESTION_REPLY, RETRIEVAL_FAILED_REPLY};
pub use session::{ChatSession, SessionStore};
