//! Ingestion endpoint

use axum::{extract::State, Json};

use crate::assistant::Assistant;
use crate::error::Result;
use crate::types::{IngestReport, IngestRequest};

/// POST /api/ingest - Re-ingest the configured documents directory
///
/// The body is optional; `{"recreate": true}` drops the collection first.
pub async fn ingest(
    State(assistant): State<Assistant>,
    request: Option<Json<IngestRequest>>,
) -> Result<Json<IngestReport>> {
    let recreate = request.map(|Json(r)| r.recreate).unwrap_or(false);
    tracing::info!(recreate, "Ingestion requested over HTTP");

    let report = assistant.ingest(recreate).await?;
    Ok(Json(report))
}
