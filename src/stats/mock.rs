//! Synthetic statistics for environments without a live store.
//!
//! Same shape and the same internal consistency rules as the real
//! provider, so dashboard work never needs a populated database. A
//! seeded generator is reproducible for fixtures.

use chrono::{Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::db::Role;

const USER_TEMPLATES: [&str; 8] = [
    "How do I configure the system?",
    "Show me the statistics for this week",
    "What changed in the latest update?",
    "Help me figure out this error",
    "How can I export my data?",
    "Can the settings be changed later?",
    "Where do I find the logs?",
    "The API connection keeps dropping, any ideas?",
];

const ASSISTANT_TEMPLATES: [&str; 8] = [
    "To configure the system, open the settings panel and adjust the parameters you need...",
    "This week: 1234 messages in total, 42 active users, average message length 87 characters...",
    "The latest update adds image support and a more detailed statistics breakdown...",
    "Check the dependency versions, file permissions, and the service logs first...",
    "Use the export command or the /api/export endpoint to download your data...",
    "Yes, settings can be changed at any time from the configuration file...",
    "Logs are written to the service log file; under systemd use journalctl to read them...",
    "Make sure the API is running on port 8000 and reachable from your network...",
];

pub struct MockStats {
    rng: Mutex<StdRng>,
}

impl MockStats {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible generator for test fixtures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for MockStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatProvider for MockStats {
    fn get_stats(&self, days: u32) -> Result<DashboardStats, PalaverError> {
        let mut rng = self.rng.lock();

        let total_users = rng.gen_range(50..=500);
        let total_messages = rng.gen_range(500..=5000);
        let active_today = rng.gen_range(5..=total_users.min(50));
        let metrics = Metrics {
            total_users,
            total_messages,
            active_today,
            avg_message_length: (rng.gen_range(50.0..150.0) * 10.0_f64).round() / 10.0,
        };

        let today = Utc::now().date_naive();
        let activity_days = (days as usize).min(ACTIVITY_CHART_MAX);
        let activity_chart = (0..activity_days)
            .map(|i| ActivityPoint {
                date: (today - Duration::days((activity_days - 1 - i) as i64)).to_string(),
                count: rng.gen_range(20..=150),
            })
            .collect();

        let chart_days = (days as usize).min(CHART_DATA_MAX);
        let chart_data = (0..chart_days)
            .map(|i| ChartPoint {
                date: (today - Duration::days((chart_days - 1 - i) as i64)).to_string(),
                active_users: rng.gen_range(3..=40),
                messages: rng.gen_range(20..=150),
                avg_length: (rng.gen_range(40.0..160.0) * 10.0_f64).round() / 10.0,
            })
            .collect();

        let now = Utc::now();
        let recent_messages = (0..RECENT_LIMIT)
            .map(|i| {
                let is_user = i % 2 == 0;
                let templates = if is_user { &USER_TEMPLATES } else { &ASSISTANT_TEMPLATES };
                let text = templates[rng.gen_range(0..templates.len())];
                RecentMessage {
                    telegram_id: rng.gen_range(100_000_000..=999_999_999),
                    role: if is_user { Role::User } else { Role::Assistant },
                    preview: crate::db::preview(text, PREVIEW_CHARS).to_string(),
                    created_at: (now - Duration::minutes(i as i64 * 5))
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                }
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
