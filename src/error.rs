use axum::http::StatusCode;
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum PalaverError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message exceeds maximum length")]
    MessageTooLong,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown user id: {0}")]
    UnknownUser(i64),

    #[error("LLM not configured (set PALAVER_LLM_URL)")]
    LlmNotConfigured,

    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PalaverError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::LlmBackend(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl axum::response::IntoResponse for PalaverError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
