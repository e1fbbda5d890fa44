//! Question handling for chat sessions and one-shot asks

use std::time::Instant;
use uuid::Uuid;

use crate::error::Result;
use crate::generation::AnswerComposer;
use crate::retrieval::Retriever;
use crate::types::{AnswerSource, ChatTurn, ComposedAnswer};

use super::session::{ChatSession, SessionStore};

pub const EMPTY_QUESTION_REPLY: &str = "Please ask a valid question.";
pub const RETRIEVAL_FAILED_REPLY: &str =
    "Sorry, I couldn't search the documents right now. Please try again.";

/// Retrieve-then-compose over one collection
#[derive(Clone)]
pub struct ChatService {
    retriever: Retriever,
    composer: AnswerComposer,
    top_k: usize,
}

impl ChatService {
    pub fn new(retriever: Retriever, composer: AnswerComposer, top_k: usize) -> Self {
        Self {
            retriever,
            composer,
            top_k,
        }
    }

    /// Answer a question without touching any session; never fails
    pub async fn answer(&self, question: &str, top_k: Option<usize>) -> ComposedAnswer {
        let question = question.trim();
        if question.is_empty() {
            return ComposedAnswer::new(EMPTY_QUESTION_REPLY, AnswerSource::NoResults);
        }

        let start = Instant::now();
        let k = top_k.unwrap_or(self.top_k);
        let answer = match self.retriever.retrieve(question, k).await {
            Ok(results) => self.composer.compose(question, &results).await,
            Err(e) => {
                tracing::error!(error = %e, "Retrieval failed");
                ComposedAnswer::new(RETRIEVAL_FAILED_REPLY, AnswerSource::RetrievalFailed)
            }
        };

        tracing::info!(
            source = answer.source.label(),
            k,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );
        answer
    }

    /// Answer inside an owned session, appending both turns
    ///
    /// An empty message is answered without being recorded.
    pub async fn ask(&self, session: &mut ChatSession, message: &str) -> ComposedAnswer {
        let message = message.trim();
        if message.is_empty() {
            return ComposedAnswer::new(EMPTY_QUESTION_REPLY, AnswerSource::NoResults);
        }

        session.push(ChatTurn::user(message));
        let answer = self.answer(message, None).await;
        session.push(ChatTurn::assistant(answer.text.clone(), answer.source));
        answer
    }

    /// Answer inside a stored session
    ///
    /// Returns the answer and the history length afterwards. The store is not
    /// locked while the answer is composed.
    pub async fn ask_in(
        &self,
        sessions: &SessionStore,
        id: Uuid,
        message: &str,
    ) -> Result<(ComposedAnswer, usize)> {
        let current = sessions.get(id)?;
        let message = message.trim();
        if message.is_empty() {
            return Ok((
                ComposedAnswer::new(EMPTY_QUESTION_REPLY, AnswerSource::NoResults),
                current.len(),
            ));
        }

        let answer = self.answer(message, None).await;
        let len = sessions.append(
            id,
            [
                ChatTurn::user(message),
                ChatTurn::assistant(answer.text.clone(), answer.source),
            ],
        )?;
        Ok((answer, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, GenerationError};
    use crate::testing::{seeded_store, FailingEmbedder, HashingEmbedder, ScriptedGenerator};
    use crate::types::ChatRole;
    use std::sync::Arc;
    use std::time::Duration;

    async fn service(composer: AnswerComposer) -> ChatService {
        let embedder = Arc::new(HashingEmbedder::new(128));
        let store = seeded_store(
            embedder.as_ref(),
            &[
                ("refunds.txt", "The refund window is 30 days."),
                ("shipping.txt", "Orders ship within two business days."),
            ],
        )
        .await;
        ChatService::new(Retriever::new(embedder, store), composer, 2)
    }

    #[tokio::test]
    async fn test_ask_appends_both_turns() {
        let primary = ScriptedGenerator::answering("flash", "You have 30 days.");
        let service = service(AnswerComposer::new(Some(primary), None, Duration::from_secs(5))).await;
        let mut session = ChatSession::new();

        let answer = service.ask(&mut session, "  What is the refund window? ").await;

        assert_eq!(answer.source, AnswerSource::AiEnhanced);
        assert_eq!(session.len(), 2);
        assert_eq!(session.turns[0].role, ChatRole::User);
        assert_eq!(session.turns[0].text, "What is the refund window?");
        assert_eq!(session.turns[1].source, Some(AnswerSource::AiEnhanced));
    }

    #[tokio::test]
    async fn test_empty_message_not_recorded() {
        let service = service(AnswerComposer::document_only()).await;
        let mut session = ChatSession::new();

        let answer = service.ask(&mut session, "   ").await;

        assert_eq!(answer.text, EMPTY_QUESTION_REPLY);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_failure_reply() {
        let store = seeded_store(&FailingEmbedder, &[]).await;
        let service = ChatService::new(
            Retriever::new(Arc::new(FailingEmbedder), store),
            AnswerComposer::document_only(),
            3,
        );
        let mut session = ChatSession::new();

        let answer = service.ask(&mut session, "What is the refund window?").await;

        assert_eq!(answer.text, RETRIEVAL_FAILED_REPLY);
        assert_eq!(answer.source, AnswerSource::RetrievalFailed);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_both_models_down_returns_excerpts() {
        let primary = ScriptedGenerator::failing(
            "flash",
            GenerationError::QuotaExceeded {
                message: "quota".to_string(),
            },
        );
        let secondary = ScriptedGenerator::failing(
            "pro",
            GenerationError::Transient {
                status: None,
                message: "connection refused".to_string(),
            },
        );
        let service = service(AnswerComposer::new(
            Some(primary),
            Some(secondary),
            Duration::from_secs(5),
        ))
        .await;

        let answer = service.answer("What is the refund window?", None).await;

        assert_eq!(answer.source, AnswerSource::DocumentSearchOnly);
        assert!(answer.text.contains("30 days"));
    }

    #[tokio::test]
    async fn test_ask_in_store() {
        let service = service(AnswerComposer::document_only()).await;
        let sessions = SessionStore::new();
        let id = sessions.create();

        let (answer, len) = service
            .ask_in(&sessions, id, "What is the refund window?")
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::DocumentSearchOnly);
        assert_eq!(len, 2);

        let (_, len) = service.ask_in(&sessions, id, "").await.unwrap();
        assert_eq!(len, 2);

        let missing = service.ask_in(&sessions, Uuid::new_v4(), "hello").await;
        assert!(matches!(missing, Err(Error::SessionNotFound(_))));
    }
}
