//! palaver — conversation history store and dashboard API for an AI
//! chat assistant.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver::{api, chat, db, llm, session, stats, AppState};

#[derive(Parser)]
#[command(name = "palaver", version, about = "Conversation store and dashboard API")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "PALAVER_PORT")]
    port: u16,

    /// SQLite database path
    #[arg(short, long, default_value = "palaver.db", env = "PALAVER_DB")]
    db: String,

    /// System prompt file for the assistant
    #[arg(long, default_value = "prompt.txt", env = "PALAVER_PROMPT")]
    prompt: std::path::PathBuf,

    /// Serve synthetic statistics instead of reading the store
    #[arg(long, env = "PALAVER_MOCK_STATS")]
    mock_stats: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let cdb = db::ChatDB::open(&args.db).expect("failed to open database");
    let shared: palaver::SharedDB = Arc::new(cdb);

    let llm_client = llm::LlmClient::from_env(&args.prompt).map(Arc::new);
    let llm_status = match &llm_client {
        Some(client) => client.model().to_string(),
        None => "disabled".into(),
    };

    let stats_provider: Arc<dyn stats::StatProvider> = if args.mock_stats {
        Arc::new(stats::MockStats::new())
    } else {
        Arc::new(stats::SqliteStats::new(shared.clone()))
    };

    let state = AppState {
        db: shared.clone(),
        sessions: session::SessionStore::new(shared.clone()),
        chat: Arc::new(chat::ChatService::new(shared)),
        llm: llm_client,
        stats: stats_provider,
        started_at: std::time::Instant::now(),
    };
    let app = api::router(state);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        db = %args.db,
        llm = %llm_status,
        mock_stats = args.mock_stats,
        "palaver starting"
    );

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    info!("shutting down");
}
