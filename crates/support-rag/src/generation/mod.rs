//! Answer generation with model fallback

mod composer;
pub mod excerpt;
pub mod prompt;

pub use composer::{AnswerComposer, FallbackState};
pub use excerpt::{format_excerpts, no_results_message};
pub use prompt::PromptBuilder;
