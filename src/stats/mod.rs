//! Dashboard statistics: response types and the provider seam.
//!
//! Both the SQLite-backed provider and the synthetic fallback satisfy
//! [`StatProvider`]; the binary picks one at startup.

mod mock;
mod real;

pub use mock::MockStats;
pub use real::SqliteStats;

use serde::Serialize;

use crate::db::Role;
use crate::error::PalaverError;

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 90;

/// Response-shape caps: charts truncate their oldest buckets to stay
/// within the dashboard contract.
pub const ACTIVITY_CHART_MAX: usize = 30;
pub const CHART_DATA_MAX: usize = 90;
pub const RECENT_LIMIT: usize = 10;
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub total_users: i64,
    pub total_messages: i64,
    pub active_today: i64,
    pub avg_message_length: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub active_users: i64,
    pub messages: i64,
    pub avg_length: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentMessage {
    pub telegram_id: i64,
    pub role: Role,
    pub preview: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub metrics: Metrics,
    pub activity_chart: Vec<ActivityPoint>,
    pub chart_data: Vec<ChartPoint>,
    pub recent_messages: Vec<RecentMessage>,
}

/// A source of dashboard statistics. Never mutates state; absence of
/// data yields zeros and empty series, not errors.
pub trait StatProvider: Send + Sync {
    fn get_stats(&self, days: u32) -> Result<DashboardStats, PalaverError>;
}

/// Keep the newest `max` entries of an ascending-by-date series.
fn cap_oldest<T>(mut series: Vec<T>, max: usize) -> Vec<T> {
    if series.len() > max {
        series.drain(..series.len() - max);
    }
    series
}
