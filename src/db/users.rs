//! Tenant resolution and user soft-delete.

use rusqlite::{params, OptionalExtension};

use super::*;

impl ChatDB {
    /// Resolve a chat-platform user id to the internal surrogate id,
    /// creating the user on first contact.
    ///
    /// Safe under concurrent first-contact for the same id: the loser
    /// of the insert race hits the UNIQUE constraint and retries the
    /// lookup. A constraint hit whose owner row is soft-deleted means a
    /// returning tenant: the row is reactivated in place, keeping the
    /// surrogate id stable.
    pub fn get_or_create_user(&self, telegram_id: i64) -> Result<i64, PalaverError> {
        let conn = self.conn()?;
        for _ in 0..3 {
            if let Some(id) = active_user_id(&conn, telegram_id)? {
                return Ok(id);
            }
            match conn.execute(
                "INSERT INTO users (telegram_id, created_at) VALUES (?1, ?2)",
                params![telegram_id, now_iso()],
            ) {
                Ok(_) => return Ok(conn.last_insert_rowid()),
                Err(e) if is_constraint_violation(&e) => {
                    let reactivated = conn.execute(
                        "UPDATE users SET deleted_at = NULL \
                         WHERE telegram_id = ?1 AND deleted_at IS NOT NULL",
                        params![telegram_id],
                    )?;
                    if reactivated > 0 {
                        tracing::debug!(telegram_id, "reactivated soft-deleted user");
                    }
                    // either way an active row exists now; re-check
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PalaverError::Internal(format!(
            "user creation kept racing for telegram_id {telegram_id}"
        )))
    }

    /// Soft-delete a user row. Messages are left untouched and stay
    /// in message-level aggregates until independently cleared.
    pub fn delete_user(&self, user_id: i64) -> Result<bool, PalaverError> {
        let changed = self.conn()?.execute(
            "UPDATE users SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now_iso(), user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>, PalaverError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, telegram_id, created_at, deleted_at FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get("id")?,
                        telegram_id: row.get("telegram_id")?,
                        created_at: row.get("created_at")?,
                        deleted_at: row.get("deleted_at")?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

fn active_user_id(conn: &rusqlite::Connection, telegram_id: i64) -> Result<Option<i64>, PalaverError> {
    let id = conn
        .query_row(
            "SELECT id FROM users WHERE telegram_id = ?1 AND deleted_at IS NULL",
            params![telegram_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}
