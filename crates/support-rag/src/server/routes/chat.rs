//! Chat session and question endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::chat::ChatSession;
use crate::error::Result;
use crate::types::{AnswerResponse, AskRequest, MessageRequest};

/// POST /api/sessions - Start a conversation
pub async fn create_session(State(assistant): State<Assistant>) -> (StatusCode, Json<Value>) {
    let id = assistant.sessions().create();
    (StatusCode::CREATED, Json(json!({ "id": id })))
}

/// GET /api/sessions/:id - Session with its history
pub async fn get_session(
    State(assistant): State<Assistant>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>> {
    Ok(Json(assistant.sessions().get(id)?))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(assistant): State<Assistant>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    assistant.sessions().delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/sessions/:id/history - Clear chat history
pub async fn clear_history(
    State(assistant): State<Assistant>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    assistant.sessions().clear(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/messages - Ask within a session
pub async fn post_message(
    State(assistant): State<Assistant>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<AnswerResponse>> {
    let (answer, history_len) = assistant
        .chat()
        .ask_in(assistant.sessions(), id, &request.message)
        .await?;

    let mut response = AnswerResponse::from(answer);
    response.history_len = Some(history_len);
    Ok(Json(response))
}

/// POST /api/ask - Stateless question
pub async fn ask(
    State(assistant): State<Assistant>,
    Json(request): Json<AskRequest>,
) -> Json<AnswerResponse> {
    let answer = assistant.ask(&request.question, request.top_k).await;
    Json(AnswerResponse::from(answer))
}
