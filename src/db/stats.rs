//! Aggregate query primitives for the dashboard and the admin chat.
//!
//! Soft-deleted rows are excluded per table, with no cascading: a
//! message whose owner was soft-deleted still counts unless the
//! message itself is deleted.

use rusqlite::params;

use super::*;

/// One calendar day of message traffic.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DayActivity {
    pub date: String,
    pub count: i64,
}

/// One calendar day with the detailed breakdown.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DayBreakdown {
    pub date: String,
    pub active_users: i64,
    pub messages: i64,
    pub avg_length: f64,
}

/// A recent message joined to its owning tenant id. `content` is the
/// raw stored envelope; callers apply preview truncation.
#[derive(Debug, Clone)]
pub struct RecentRow {
    pub telegram_id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl ChatDB {
    pub fn count_users(&self) -> Result<i64, PalaverError> {
        let n = self.conn()?.query_row(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    pub fn count_messages(&self) -> Result<i64, PalaverError> {
        let n = self.conn()?.query_row(
            "SELECT COUNT(*) FROM messages WHERE deleted_at IS NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Distinct users with a live message at or after `cutoff`
    /// (ISO-8601 text; lexical compare is chronological).
    pub fn active_since(&self, cutoff: &str) -> Result<i64, PalaverError> {
        let n = self.conn()?.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM messages \
             WHERE deleted_at IS NULL AND created_at >= ?1",
            params![cutoff],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Mean stored length over live messages; 0.0 when there are none.
    pub fn avg_message_length(&self) -> Result<f64, PalaverError> {
        let avg = self.conn()?.query_row(
            "SELECT COALESCE(AVG(length), 0.0) FROM messages WHERE deleted_at IS NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(avg)
    }

    /// Message count per calendar day since `cutoff`, ascending by
    /// date. Days with no live messages are absent, not zero.
    pub fn messages_per_day(&self, cutoff: &str) -> Result<Vec<DayActivity>, PalaverError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DATE(created_at) AS day, COUNT(*) \
             FROM messages WHERE deleted_at IS NULL AND created_at >= ?1 \
             GROUP BY day ORDER BY day",
        )?;
        let rows = stmt
            .query_map(params![cutoff], |row| {
                Ok(DayActivity {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Per-day distinct-user, message-count, and mean-length breakdown
    /// since `cutoff`; same date partitioning and omit-empty-days
    /// policy as [`messages_per_day`](Self::messages_per_day).
    pub fn breakdown_per_day(&self, cutoff: &str) -> Result<Vec<DayBreakdown>, PalaverError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DATE(created_at) AS day, COUNT(DISTINCT user_id), COUNT(*), \
                    COALESCE(AVG(length), 0.0) \
             FROM messages WHERE deleted_at IS NULL AND created_at >= ?1 \
             GROUP BY day ORDER BY day",
        )?;
        let rows = stmt
            .query_map(params![cutoff], |row| {
                Ok(DayBreakdown {
                    date: row.get(0)?,
                    active_users: row.get(1)?,
                    messages: row.get(2)?,
                    avg_length: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Live message count per role.
    pub fn role_counts(&self) -> Result<Vec<(Role, i64)>, PalaverError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT role, COUNT(*) FROM messages WHERE deleted_at IS NULL \
             GROUP BY role ORDER BY role",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The most recent live messages across all tenants, newest first,
    /// joined to the owning tenant id.
    pub fn recent_messages(&self, limit: usize) -> Result<Vec<RecentRow>, PalaverError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.telegram_id, m.role, m.content, m.created_at \
             FROM messages m JOIN users u ON m.user_id = u.id \
             WHERE m.deleted_at IS NULL \
             ORDER BY m.created_at DESC, m.id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RecentRow {
                    telegram_id: row.get(0)?,
                    role: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
