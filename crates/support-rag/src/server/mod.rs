//! HTTP server for the assistant

pub mod routes;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::assistant::Assistant;
use crate::config::RagConfig;
use crate::error::{Error, Result};

/// Assistant HTTP server
pub struct SupportServer {
    config: RagConfig,
    assistant: Assistant,
}

impl SupportServer {
    /// Build the assistant from `config` and wrap it in a server
    pub fn new(config: RagConfig) -> Result<Self> {
        let assistant = Assistant::from_config(config.clone())?;
        Ok(Self { config, assistant })
    }

    pub fn router(&self) -> Router {
        build_router(self.assistant.clone(), self.config.server.enable_cors)
    }

    /// Bind and serve until the process is stopped
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();
        tracing::info!("Starting support assistant on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Router with every route and middleware layer
pub fn build_router(assistant: Assistant, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes())
        .with_state(assistant)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::GenerationProvider;
    use crate::storage::SqliteVectorStore;
    use crate::testing::{HashingEmbedder, ScriptedGenerator};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app(documents: &std::path::Path) -> Router {
        let mut config = RagConfig::default();
        config.data.documents_dir = documents.to_path_buf();
        let primary: Arc<dyn GenerationProvider> =
            ScriptedGenerator::answering("flash", "Refunds are accepted for 30 days.");
        let assistant = Assistant::with_components(
            config,
            Arc::new(HashingEmbedder::new(64)),
            Arc::new(SqliteVectorStore::in_memory("support_docs").unwrap()),
            Some(primary),
            None,
        );
        build_router(assistant, true)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_ingest_and_ask() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("faq.txt"), "The refund window is 30 days.").unwrap();
        let app = app(dir.path()).await;

        let (status, report) = send(&app, "POST", "/api/ingest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["files_ingested"], 1);

        let (status, answer) = send(
            &app,
            "POST",
            "/api/ask",
            Some(json!({"question": "What is the refund window?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answer["source"], "ai-enhanced");
        assert_eq!(answer["label"], "ai-enhanced");
        assert_eq!(answer["answer"], "Refunds are accepted for 30 days.");
        assert!(answer.get("history_len").is_none());
    }

    #[tokio::test]
    async fn test_session_flow() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, created) = send(&app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, reply) = send(
            &app,
            "POST",
            &format!("/api/sessions/{}/messages", id),
            Some(json!({"message": "Do you ship abroad?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["source"], "no-results");
        assert_eq!(reply["history_len"], 2);

        let (_, session) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
        assert_eq!(session["turns"].as_array().unwrap().len(), 2);
        assert_eq!(session["turns"][0]["role"], "user");

        let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{}/history", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, session) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
        assert!(session["turns"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, error) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) = send(&app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "ai-with-fallback");
        assert_eq!(body["embedder"]["name"], "hashing");
        assert_eq!(body["vector_db"]["chunks"], 0);
    }
}
