//! Answer composer: primary model, secondary model, then raw excerpts
//!
//! The fallback runs as an explicit state machine. Each remote state makes
//! one bounded call, records it, and either produces the answer or names the
//! next state. Composition never fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RagConfig;
use crate::error::GenerationError;
use crate::providers::GenerationProvider;
use crate::types::{AnswerSource, AttemptOutcome, AttemptRecord, ComposedAnswer, QueryResult};

use super::excerpt::{format_excerpts, no_results_message};
use super::prompt::PromptBuilder;

/// States of the fallback sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    PrimaryAttempt,
    SecondaryAttempt,
    DocumentOnly,
    NoResults,
}

enum Transition {
    Answer(String, AnswerSource),
    Next(FallbackState),
}

/// Composes the final answer for a question and its retrieved chunks
#[derive(Clone)]
pub struct AnswerComposer {
    primary: Option<Arc<dyn GenerationProvider>>,
    secondary: Option<Arc<dyn GenerationProvider>>,
    timeout: Duration,
    excerpt_chars: usize,
    context_chars: usize,
}

impl AnswerComposer {
    pub fn new(
        primary: Option<Arc<dyn GenerationProvider>>,
        secondary: Option<Arc<dyn GenerationProvider>>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            timeout,
            excerpt_chars: 500,
            context_chars: 1000,
        }
    }

    /// Composer without remote models; every answer is document-only
    pub fn document_only() -> Self {
        Self::new(None, None, Duration::from_secs(30))
    }

    pub fn from_config(
        config: &RagConfig,
        primary: Option<Arc<dyn GenerationProvider>>,
        secondary: Option<Arc<dyn GenerationProvider>>,
    ) -> Self {
        Self::new(primary, secondary, config.generation.timeout())
            .with_excerpt_chars(config.retrieval.excerpt_chars)
            .with_context_chars(config.retrieval.context_chars_per_chunk)
    }

    /// Set excerpt_chars
    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// Set context_chars
    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    /// Produce an answer; never fails
    pub async fn compose(&self, question: &str, results: &[QueryResult]) -> ComposedAnswer {
        let mut attempts = Vec::new();
        let mut state = if results.is_empty() {
            FallbackState::NoResults
        } else {
            FallbackState::PrimaryAttempt
        };
        let prompt = PromptBuilder::build_answer_prompt(
            question,
            &PromptBuilder::build_context(results, self.context_chars),
        );

        loop {
            let transition = match state {
                FallbackState::NoResults => {
                    Transition::Answer(no_results_message(question), AnswerSource::NoResults)
                }
                FallbackState::DocumentOnly => Transition::Answer(
                    format_excerpts(results, self.excerpt_chars),
                    AnswerSource::DocumentSearchOnly,
                ),
                FallbackState::PrimaryAttempt => match &self.primary {
                    None => Transition::Next(FallbackState::DocumentOnly),
                    Some(provider) => {
                        match self.attempt(provider.as_ref(), &prompt, &mut attempts).await {
                            Ok(text) => Transition::Answer(text, AnswerSource::AiEnhanced),
                            Err(e) if e.triggers_secondary() && self.secondary.is_some() => {
                                tracing::warn!(
                                    model = provider.model(),
                                    kind = e.kind(),
                                    "Primary model failed, trying secondary"
                                );
                                Transition::Next(FallbackState::SecondaryAttempt)
                            }
                            Err(e) => {
                                tracing::warn!(
                                    model = provider.model(),
                                    kind = e.kind(),
                                    "Primary model failed, using document search"
                                );
                                Transition::Next(FallbackState::DocumentOnly)
                            }
                        }
                    }
                },
                FallbackState::SecondaryAttempt => match &self.secondary {
                    None => Transition::Next(FallbackState::DocumentOnly),
                    Some(provider) => {
                        match self.attempt(provider.as_ref(), &prompt, &mut attempts).await {
                            Ok(text) => Transition::Answer(text, AnswerSource::AiEnhancedSecondary),
                            Err(e) => {
                                tracing::warn!(
                                    model = provider.model(),
                                    kind = e.kind(),
                                    "Secondary model failed, using document search"
                                );
                                Transition::Next(FallbackState::DocumentOnly)
                            }
                        }
                    }
                },
            };

            match transition {
                Transition::Next(next) => state = next,
                Transition::Answer(text, source) => {
                    tracing::info!(
                        source = source.label(),
                        chunks = results.len(),
                        attempts = attempts.len(),
                        "Answer composed"
                    );
                    return ComposedAnswer {
                        text,
                        source,
                        attempts,
                    };
                }
            }
        }
    }

    /// One bounded remote call, recorded in `attempts`
    async fn attempt(
        &self,
        provider: &dyn GenerationProvider,
        prompt: &str,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, provider.generate(prompt)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(GenerationError::Malformed {
                message: "empty response".to_string(),
            }),
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GenerationError::Timeout {
                after: self.timeout,
            }),
        };

        let outcome = match &result {
            Ok(_) => AttemptOutcome::Succeeded,
            Err(e) => AttemptOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        };
        attempts.push(AttemptRecord {
            model: provider.model().to_string(),
            outcome,
            elapsed_ms: start.elapsed().as_millis() as u64,
        });

        result
    }
}
