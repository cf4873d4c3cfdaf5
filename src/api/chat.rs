//! Conversational handlers: the dashboard chat and the tenant turn
//! boundary the messaging transport talks to.
//!
//! Bodies are parsed by hand so malformed requests come back as
//! structured 400s before anything reaches the core.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::chat::ChatMode;
use crate::error::PalaverError;
use crate::llm::Turn;
use crate::AppState;

const MAX_CHAT_MESSAGE_CHARS: usize = 4000;

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ChatResponse {
    message: String,
    session_id: String,
    mode: ChatMode,
}

pub(super) async fn dashboard_chat(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<ChatResponse>, PalaverError> {
    let req: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| PalaverError::Validation(format!("invalid chat body: {e}")))?;

    if req.message.trim().is_empty() {
        return Err(PalaverError::EmptyMessage);
    }
    if req.message.chars().count() > MAX_CHAT_MESSAGE_CHARS {
        return Err(PalaverError::MessageTooLong);
    }
    let mode = match req.mode.as_deref() {
        None | Some("normal") => ChatMode::Normal,
        Some("admin") => ChatMode::Admin,
        Some(other) => {
            return Err(PalaverError::Validation(format!("invalid mode: {other:?}")))
        }
    };

    let llm = state.llm.as_ref().ok_or(PalaverError::LlmNotConfigured)?;
    let (message, session_id) = state
        .chat
        .process(llm, req.message, mode, req.session_id)
        .await;
    Ok(Json(ChatResponse {
        message,
        session_id,
        mode,
    }))
}

#[derive(Deserialize)]
struct TurnRequest {
    telegram_id: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    image_base64: Option<String>,
}

pub(super) async fn turn(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<serde_json::Value>, PalaverError> {
    let req: TurnRequest = serde_json::from_slice(&body)
        .map_err(|e| PalaverError::Validation(format!("invalid turn body: {e}")))?;

    // a bare image with an empty caption is a valid turn
    if req.text.trim().is_empty() && req.image_base64.is_none() {
        return Err(PalaverError::EmptyMessage);
    }

    let llm = state.llm.as_ref().ok_or(PalaverError::LlmNotConfigured)?;
    let reply = state
        .sessions
        .converse(llm, req.telegram_id, req.text, req.image_base64)
        .await?;
    Ok(Json(serde_json::json!({ "reply": reply })))
}

pub(super) async fn history(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> Result<Json<Vec<Turn>>, PalaverError> {
    let sessions = state.sessions.clone();
    let turns = blocking(move || sessions.session(telegram_id)).await??;
    Ok(Json(turns))
}

#[derive(Deserialize)]
struct ResetRequest {
    telegram_id: i64,
}

pub(super) async fn reset(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<serde_json::Value>, PalaverError> {
    let req: ResetRequest = serde_json::from_slice(&body)
        .map_err(|e| PalaverError::Validation(format!("invalid reset body: {e}")))?;
    let sessions = state.sessions.clone();
    let cleared = blocking(move || sessions.clear(req.telegram_id)).await??;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}
