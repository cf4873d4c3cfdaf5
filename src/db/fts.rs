//! FTS5 index maintenance and search.
//!
//! The index is a projection of the live (non-deleted) message set.
//! Inserts and soft-deletes update it inside the base-table
//! transaction; this module owns startup realignment, repair, and the
//! query path.

use rusqlite::params;

use super::*;
use crate::envelope;

/// A search hit joined to its owning tenant.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub telegram_id: i64,
    pub role: Role,
    pub preview: String,
    pub created_at: String,
    pub rank: f64,
}

impl ChatDB {
    /// Realign the index with the live message set. Runs on open;
    /// no-op when the counts already agree.
    pub(super) fn rebuild_fts(&self) -> Result<(), PalaverError> {
        let conn = self.conn()?;
        let indexed: i64 = conn.query_row("SELECT COUNT(*) FROM messages_fts", [], |r| r.get(0))?;
        let live: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE deleted_at IS NULL",
            [],
            |r| r.get(0),
        )?;
        if indexed == live {
            return Ok(());
        }

        conn.execute("DELETE FROM messages_fts", [])?;
        let mut stmt =
            conn.prepare("SELECT id, content FROM messages WHERE deleted_at IS NULL")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (id, content) in &rows {
            conn.execute(
                "INSERT INTO messages_fts (id, content) VALUES (?1, ?2)",
                params![id, envelope::searchable_text(content)],
            )?;
        }
        tracing::info!(count = rows.len(), "rebuilt message search index");
        Ok(())
    }

    /// Remove index entries whose message is gone or soft-deleted, and
    /// re-add live messages missing from the index.
    /// Returns (orphans_removed, missing_rebuilt).
    pub fn repair_fts(&self) -> Result<(usize, usize), PalaverError> {
        let conn = self.conn()?;

        let orphans = conn.execute(
            "DELETE FROM messages_fts WHERE id NOT IN \
             (SELECT id FROM messages WHERE deleted_at IS NULL)",
            [],
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, content FROM messages WHERE deleted_at IS NULL \
             AND id NOT IN (SELECT id FROM messages_fts)",
        )?;
        let missing: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        for (id, content) in &missing {
            conn.execute(
                "INSERT INTO messages_fts (id, content) VALUES (?1, ?2)",
                params![id, envelope::searchable_text(content)],
            )?;
        }

        Ok((orphans, missing.len()))
    }

    /// Index health: (orphaned entries, live messages missing an entry).
    pub fn fts_integrity(&self) -> Result<(i64, i64), PalaverError> {
        let conn = self.conn()?;
        let orphans: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages_fts WHERE id NOT IN \
             (SELECT id FROM messages WHERE deleted_at IS NULL)",
            [],
            |r| r.get(0),
        )?;
        let missing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE deleted_at IS NULL \
             AND id NOT IN (SELECT id FROM messages_fts)",
            [],
            |r| r.get(0),
        )?;
        Ok((orphans, missing))
    }

    /// Full-text search over live messages, best match first.
    /// Terms are OR-combined after sanitization; an empty effective
    /// query returns no hits rather than an FTS syntax error.
    pub fn search_messages(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, PalaverError> {
        let sanitized: String = query
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let terms: Vec<String> = sanitized
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Ok(vec![]);
        }
        let match_expr = terms.join(" OR ");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.rank, u.telegram_id, m.role, m.content, m.created_at \
             FROM messages_fts f \
             JOIN messages m ON m.id = f.id \
             JOIN users u ON u.id = m.user_id \
             WHERE f.messages_fts MATCH ?1 \
             ORDER BY f.rank LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(params![match_expr, limit as i64], |row| {
                let content: String = row.get("content")?;
                Ok(SearchHit {
                    id: row.get("id")?,
                    telegram_id: row.get("telegram_id")?,
                    role: row.get("role")?,
                    preview: preview(envelope::searchable_text(&content).as_str(), 100)
                        .to_string(),
                    created_at: row.get("created_at")?,
                    rank: -row.get::<_, f64>("rank")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }
}

#[cfg(test)]
#[path = "fts_tests.rs"]
mod tests;
