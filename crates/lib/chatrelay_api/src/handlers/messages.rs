//! `/api/messages` handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use chatrelay_core::models::Message;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{MessagesQuery, SendMessageRequest, SendMessageResponse};

/// `GET /api/messages?email=`: conversation history, oldest first.
pub async fn list_messages_handler(
    State(state): State<AppState>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Message>>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let email = query.email.unwrap_or_default();
    let messages = state.relay.history(&email).await?;
    Ok(Json(messages))
}

/// `POST /api/messages`: store the message, answer it, store the answer.
///
/// The flow runs on its own task so a client disconnect does not cut it off
/// between the two inserts.
pub async fn send_message_handler(
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> AppResult<Json<SendMessageResponse>> {
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let relay = state.relay.clone();

    let exchange = tokio::spawn(async move { relay.send(&body.content, &body.email).await })
        .await
        .map_err(|e| AppError::Internal(format!("send task failed: {e}")))??;

    Ok(Json(SendMessageResponse {
        user_message: exchange.user_message,
        ai_message: exchange.ai_message,
        status: "success".into(),
    }))
}
