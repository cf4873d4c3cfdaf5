//! Dashboard query handlers: statistics and search.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::blocking;
use crate::error::PalaverError;
use crate::stats::{self, DashboardStats};
use crate::AppState;

#[derive(Deserialize)]
pub(super) struct StatsQuery {
    days: Option<u32>,
}

pub(super) async fn get_stats(
    State(state): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<DashboardStats>, PalaverError> {
    let days = q.days.unwrap_or(stats::DEFAULT_DAYS);
    if days == 0 || days > stats::MAX_DAYS {
        return Err(PalaverError::Validation(format!(
            "days must be between 1 and {}",
            stats::MAX_DAYS
        )));
    }
    let provider = state.stats.clone();
    let dashboard = blocking(move || provider.get_stats(days)).await??;
    Ok(Json(dashboard))
}

#[derive(Deserialize)]
pub(super) struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

pub(super) async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, PalaverError> {
    if query.q.trim().is_empty() {
        return Err(PalaverError::Validation("query must not be empty".into()));
    }
    let limit = query.limit.unwrap_or(20).min(100);
    let db = state.db.clone();
    let hits = blocking(move || db.search_messages(&query.q, limit)).await??;
    Ok(Json(serde_json::json!({ "results": hits })))
}
