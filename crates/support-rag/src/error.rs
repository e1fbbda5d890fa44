//! Error types for the assistant

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Assistant errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Embedding dimensionality differs from the collection's
    #[error("Embedding dimension mismatch: collection uses {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector database error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// Remote generation error
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Chat session not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::VectorDb(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::FileParse { filename, message } => (
                StatusCode::BAD_REQUEST,
                "parse_error",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::UnsupportedFileType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::Embedding(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "embedding_error", msg.clone())
            }
            Error::DimensionMismatch { .. } => (
                StatusCode::CONFLICT,
                "dimension_mismatch",
                self.to_string(),
            ),
            Error::VectorDb(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "vector_db_error", msg.clone())
            }
            Error::Generation(err) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "generation_error",
                err.to_string(),
            ),
            Error::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Session not found: {}", id),
            ),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Phrases that identify a quota or rate-limit failure in an error message
const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "resource_exhausted",
    "too many requests",
    "limit exceeded",
];

/// Failure of a single remote generation call
///
/// The answer composer branches on the kind: quota, transient and timeout
/// failures move on to the secondary model, everything else goes straight to
/// the document-only answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Rate limit or quota exhausted (429, RESOURCE_EXHAUSTED)
    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    /// Server-side or network failure that may succeed elsewhere
    #[error("Transient failure{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transient { status: Option<u16>, message: String },

    /// The call did not finish within the per-call deadline
    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The endpoint answered but the payload was unusable
    #[error("Malformed response: {message}")]
    Malformed { message: String },

    /// The request was refused (authentication, invalid request, blocked content)
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl GenerationError {
    /// Whether this failure should trigger the secondary model
    pub fn triggers_secondary(&self) -> bool {
        matches!(
            self,
            GenerationError::QuotaExceeded { .. }
                | GenerationError::Transient { .. }
                | GenerationError::Timeout { .. }
        )
    }

    pub fn is_quota_error(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded { .. })
    }

    /// Short machine-readable kind, used in attempt records
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::QuotaExceeded { .. } => "quota_exceeded",
            GenerationError::Transient { .. } => "transient",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::Malformed { .. } => "malformed",
            GenerationError::Rejected { .. } => "rejected",
        }
    }

    /// Classify a non-success HTTP response
    pub fn from_status_and_body(status: u16, body: &str) -> Self {
        // Google APIs wrap details as {"error": {"message": ..., "status": ...}}
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                let error = v.get("error")?;
                let msg = error.get("message").and_then(|m| m.as_str()).unwrap_or("");
                let code = error.get("status").and_then(|s| s.as_str()).unwrap_or("");
                Some(format!("{} {}", code, msg).trim().to_string())
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        if status == 429 || mentions_quota(&message) {
            return GenerationError::QuotaExceeded { message };
        }

        match status {
            500..=599 => GenerationError::Transient {
                status: Some(status),
                message,
            },
            _ => GenerationError::Rejected { status, message },
        }
    }

    /// Classify a transport-level failure
    pub fn from_reqwest_error(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            return GenerationError::Timeout { after: timeout };
        }
        if let Some(status) = error.status() {
            return Self::from_status_and_body(status.as_u16(), &error.to_string());
        }
        if error.is_decode() {
            return GenerationError::Malformed {
                message: error.to_string(),
            };
        }
        GenerationError::Transient {
            status: None,
            message: error.to_string(),
        }
    }
}

fn mentions_quota(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_quota() {
        let err = GenerationError::from_status_and_body(429, "slow down");
        assert!(err.is_quota_error());
        assert!(err.triggers_secondary());
    }

    #[test]
    fn test_resource_exhausted_body_is_quota() {
        let body = r#"{"error": {"code": 403, "message": "Quota exceeded for quota metric", "status": "PERMISSION_DENIED"}}"#;
        let err = GenerationError::from_status_and_body(403, body);
        assert!(err.is_quota_error());
    }

    #[test]
    fn test_server_error_is_transient() {
        let err = GenerationError::from_status_and_body(503, "unavailable");
        assert_eq!(
            err,
            GenerationError::Transient {
                status: Some(503),
                message: "unavailable".to_string()
            }
        );
        assert!(err.triggers_secondary());
    }

    #[test]
    fn test_auth_failure_skips_secondary() {
        let body = r#"{"error": {"code": 401, "message": "API key not valid", "status": "UNAUTHENTICATED"}}"#;
        let err = GenerationError::from_status_and_body(401, body);
        assert!(matches!(err, GenerationError::Rejected { status: 401, .. }));
        assert!(!err.triggers_secondary());
    }

    #[test]
    fn test_malformed_skips_secondary() {
        let err = GenerationError::Malformed {
            message: "no candidates".to_string(),
        };
        assert!(!err.triggers_secondary());
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_error_response_status() {
        let not_found = Error::SessionNotFound("abc".to_string()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let internal = Error::Internal("join failed".to_string()).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let mismatch = Error::DimensionMismatch {
            expected: 768,
            actual: 384,
        }
        .into_response();
        assert_eq!(mismatch.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_timeout_display() {
        let err = GenerationError::Timeout {
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Request timed out after 1500ms");
        assert!(err.triggers_secondary());
    }
}
