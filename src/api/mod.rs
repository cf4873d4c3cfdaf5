use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::PalaverError;
use crate::{blocking, AppState};

mod chat;
mod dashboard;

use chat::*;
use dashboard::*;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/stats", get(get_stats))
        .route("/api/search", get(search))
        .route("/api/chat", post(dashboard_chat))
        .route("/api/turn", post(turn))
        .route("/api/history/{telegram_id}", get(history))
        .route("/api/reset", post(reset))
        // open dashboard API; image payloads need the larger body limit
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "palaver",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /": "this index",
            "GET /health": "health data (uptime, db size, counts, index integrity)",
            "GET /api/stats?days=7": "dashboard statistics",
            "GET /api/search?q=term": "full-text search over live messages",
            "POST /api/chat": "dashboard chat (body: {message, mode, session_id?})",
            "POST /api/turn": "one conversational turn (body: {telegram_id, text, image_base64?})",
            "GET /api/history/{telegram_id}": "decoded conversation history",
            "POST /api/reset": "clear a tenant's history (body: {telegram_id})",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, PalaverError> {
    let db = state.db.clone();
    let (users, messages, integrity, db_size_mb) = blocking(move || {
        let users = db.count_users()?;
        let messages = db.count_messages()?;
        let integrity = db.fts_integrity()?;
        let mb = (db.db_size_bytes() as f64 / 1048576.0 * 10.0).round() / 10.0;
        Ok::<_, PalaverError>((users, messages, integrity, mb))
    })
    .await??;

    let (orphans, missing) = integrity;
    Ok(Json(serde_json::json!({
        "name": "palaver",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "db_size_mb": db_size_mb,
        "llm_enabled": state.llm.is_some(),
        "users": users,
        "messages": messages,
        "chat_sessions": state.chat.session_count(),
        "search_index": {
            "orphans": orphans,
            "missing": missing,
            "ok": orphans == 0 && missing == 0,
        },
    })))
}
