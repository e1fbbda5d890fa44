//! API routes for the assistant server

pub mod chat;
pub mod ingest;
pub mod status;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assistant::Assistant;

/// Build all API routes
pub fn api_routes() -> Router<Assistant> {
    Router::new()
        .route("/status", get(status::status))
        .route("/ingest", post(ingest::ingest))
        .route("/ask", post(chat::ask))
        .route("/sessions", post(chat::create_session))
        .route(
            "/sessions/:id",
            get(chat::get_session).delete(chat::delete_session),
        )
        .route("/sessions/:id/messages", post(chat::post_message))
        .route(
            "/sessions/:id/history",
            axum::routing::delete(chat::clear_history),
        )
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "support-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Support-document Q&A with model fallback",
        "endpoints": {
            "GET /api/status": "Embedder health, collection size and mode",
            "POST /api/ingest": "Re-ingest the documents directory",
            "POST /api/ask": "Stateless question",
            "POST /api/sessions": "Create a chat session",
            "GET /api/sessions/:id": "Session history",
            "DELETE /api/sessions/:id": "Delete a session",
            "POST /api/sessions/:id/messages": "Ask within a session",
            "DELETE /api/sessions/:id/history": "Clear chat history"
        }
    }))
}
