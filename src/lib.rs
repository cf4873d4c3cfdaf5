pub mod api;
pub mod chat;
pub mod db;
pub mod envelope;
pub mod error;
pub mod llm;
pub mod session;
pub mod stats;

use std::sync::Arc;

pub type SharedDB = Arc<db::ChatDB>;

/// Run a blocking closure on tokio's blocking pool and surface a
/// JoinError as an internal error.
///
/// Synchronous store work called from a handler goes through here so
/// SQLite never blocks a runtime worker.
pub async fn blocking<T, F>(f: F) -> Result<T, error::PalaverError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| error::PalaverError::Internal(e.to_string()))
}

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDB,
    pub sessions: session::SessionStore,
    pub chat: Arc<chat::ChatService>,
    pub llm: Option<Arc<llm::LlmClient>>,
    pub stats: Arc<dyn stats::StatProvider>,
    pub started_at: std::time::Instant,
}
