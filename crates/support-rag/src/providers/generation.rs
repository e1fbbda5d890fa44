//! Generation provider trait for remote answer composition

use async_trait::async_trait;

use crate::error::GenerationError;

/// A hosted model that turns a prompt into an answer
///
/// Errors are classified so the caller can decide whether another model is
/// worth trying.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
