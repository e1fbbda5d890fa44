//! Status endpoint

use axum::{extract::State, Json};

use crate::assistant::Assistant;
use crate::error::Result;
use crate::types::SystemStatus;

/// GET /api/status - Embedder health, store size and generation mode
pub async fn status(State(assistant): State<Assistant>) -> Result<Json<SystemStatus>> {
    Ok(Json(assistant.status().await?))
}
