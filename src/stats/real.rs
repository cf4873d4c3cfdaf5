//! Statistics computed from the live store.

use super::*;
use crate::db::{iso_days_ago, iso_hours_ago, preview};
use crate::envelope;
use crate::SharedDB;

pub struct SqliteStats {
    db: SharedDB,
}

impl SqliteStats {
    pub fn new(db: SharedDB) -> Self {
        Self { db }
    }
}

impl StatProvider for SqliteStats {
    fn get_stats(&self, days: u32) -> Result<DashboardStats, PalaverError> {
        let metrics = Metrics {
            total_users: self.db.count_users()?,
            total_messages: self.db.count_messages()?,
            // rolling 24h lookback, distinct from the calendar-day buckets below
            active_today: self.db.active_since(&iso_hours_ago(24))?,
            avg_message_length: self.db.avg_message_length()?,
        };

        let cutoff = iso_days_ago(i64::from(days));
        let activity_chart = cap_oldest(
            self.db
                .messages_per_day(&cutoff)?
                .into_iter()
                .map(|d| ActivityPoint {
                    date: d.date,
                    count: d.count,
                })
                .collect(),
            ACTIVITY_CHART_MAX,
        );
        let chart_data = cap_oldest(
            self.db
                .breakdown_per_day(&cutoff)?
                .into_iter()
                .map(|d| ChartPoint {
                    date: d.date,
                    active_users: d.active_users,
                    messages: d.messages,
                    avg_length: d.avg_length,
                })
                .collect(),
            CHART_DATA_MAX,
        );

        let recent_messages = self
            .db
            .recent_messages(RECENT_LIMIT)?
            .into_iter()
            .map(|row| RecentMessage {
                telegram_id: row.telegram_id,
                role: row.role,
                preview: preview(envelope::searchable_text(&row.content).as_str(), PREVIEW_CHARS)
                    .to_string(),
                created_at: row.created_at,
            })
            .collect();

        Ok(DashboardStats {
            metrics,
            activity_chart,
            chart_data,
            recent_messages,
        })
    }
}
