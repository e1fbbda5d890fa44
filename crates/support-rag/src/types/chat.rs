//! Conversation turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::response::AnswerSource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Provenance of assistant replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<AnswerSource>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            source: None,
        }
    }

    pub fn assistant(text: impl Into<String>, source: AnswerSource) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            source: Some(source),
        }
    }
}
