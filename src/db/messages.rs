//! Message append, ordered retrieval, and bulk soft-delete.

use rusqlite::params;

use super::*;
use crate::envelope;

impl ChatDB {
    /// Append a turn to a user's history. The FTS entry is written in
    /// the same transaction as the row, so the index can never drift.
    pub fn add_message(
        &self,
        user_id: i64,
        role: Role,
        content: &str,
    ) -> Result<Message, PalaverError> {
        self.add_message_at(user_id, role, content, &now_iso())
    }

    /// Like [`add_message`](Self::add_message) with a caller-supplied
    /// timestamp. Used for history backfill and time-window tests.
    pub fn add_message_at(
        &self,
        user_id: i64,
        role: Role,
        content: &str,
        created_at: &str,
    ) -> Result<Message, PalaverError> {
        let length = content.chars().count() as i64;
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        if let Err(e) = tx.execute(
            "INSERT INTO messages (user_id, role, content, length, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, role, content, length, created_at],
        ) {
            if is_constraint_violation(&e) {
                return Err(PalaverError::UnknownUser(user_id));
            }
            return Err(e.into());
        }
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO messages_fts (id, content) VALUES (?1, ?2)",
            params![id, envelope::searchable_text(content)],
        )?;
        tx.commit()?;

        Ok(Message {
            id,
            user_id,
            role,
            content: content.to_string(),
            length,
            created_at: created_at.to_string(),
            deleted_at: None,
        })
    }

    /// All non-deleted messages for a user, ascending by creation time.
    /// Empty history is an empty vec, not an error.
    pub fn list_messages(&self, user_id: i64) -> Result<Vec<Message>, PalaverError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, role, content, length, created_at, deleted_at \
             FROM messages WHERE user_id = ?1 AND deleted_at IS NULL \
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![user_id], row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Soft-delete every active message for a user and drop their FTS
    /// entries, atomically. Idempotent: an already-cleared history is a
    /// no-op returning 0.
    pub fn clear_messages(&self, user_id: i64) -> Result<usize, PalaverError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM messages_fts WHERE id IN \
             (SELECT id FROM messages WHERE user_id = ?1 AND deleted_at IS NULL)",
            params![user_id],
        )?;
        let cleared = tx.execute(
            "UPDATE messages SET deleted_at = ?1 WHERE user_id = ?2 AND deleted_at IS NULL",
            params![now_iso(), user_id],
        )?;
        tx.commit()?;
        if cleared > 0 {
            tracing::debug!(user_id, cleared, "cleared message history");
        }
        Ok(cleared)
    }
}
