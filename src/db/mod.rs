//! SQLite-backed conversation store with soft-delete semantics and an
//! FTS5 full-text index maintained on the write path.

mod fts;
mod messages;
mod stats;
mod users;

pub use fts::SearchHit;
pub use stats::{DayActivity, DayBreakdown, RecentRow};

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::PalaverError;

/// Per-connection setup for every connection the pool creates.
/// busy_timeout prevents SQLITE_BUSY when the chat path and the stats
/// path write concurrently; foreign_keys is off by default in SQLite
/// and must be enabled on each connection.
#[derive(Debug)]
struct ConnCustomizer;
impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for ConnCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(())
    }
}

type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = PalaverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(PalaverError::Validation(format!("unknown role: {other:?}"))),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PalaverError| FromSqlError::Other(Box::new(e)))
    }
}

/// An active chat tenant. `deleted_at` set means the row is invisible
/// to lookups and excluded from user-level aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// A stored conversation turn. `content` is the encoded envelope
/// (bare text, or a JSON object for turns carrying an image) and
/// `length` is its character count at insert time — never recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub role: Role,
    pub content: String,
    pub length: i64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// Current UTC time as ISO-8601 text with millisecond precision.
/// Lexical order equals chronological order, and SQLite's date
/// functions accept the format directly.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn iso_hours_ago(hours: i64) -> String {
    (Utc::now() - chrono::Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn iso_days_ago(days: i64) -> String {
    (Utc::now() - chrono::Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First `max` characters of `content`, char-safe.
pub fn preview(content: &str, max: usize) -> &str {
    match content.char_indices().nth(max) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    length INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_user_messages ON messages(user_id, deleted_at);
";

// External-content FTS — the store manages inserts/deletes itself so
// soft-deleted rows vanish from the index in the same transaction that
// marks them, and image payloads never reach the tokenizer.
const FTS_SCHEMA: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(\
     id UNINDEXED, content, tokenize='unicode61')";

/// SQLite-backed conversation store.
pub struct ChatDB {
    pool: Pool<SqliteConnectionManager>,
}

impl ChatDB {
    /// Open the database at `path`, creating it (and the schema) if
    /// needed. Eight pooled connections for files; WAL keeps readers
    /// unblocked while the single writer commits.
    pub fn open(path: &str) -> Result<Self, PalaverError> {
        let pool_size = if path == ":memory:" { 2 } else { 8 };
        let manager = if path == ":memory:" {
            // A named shared-cache DB keeps every pooled connection on
            // the same in-memory store, and the random name isolates
            // parallel test runs from each other.
            let name = uuid::Uuid::new_v4().to_string();
            SqliteConnectionManager::file(format!("file:{name}?mode=memory&cache=shared"))
        } else {
            SqliteConnectionManager::file(path)
        };
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_customizer(Box::new(ConnCustomizer))
            .build(manager)
            .map_err(|e| PalaverError::Internal(format!("pool: {e}")))?;

        let conn = pool.get().map_err(|e| PalaverError::Internal(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(FTS_SCHEMA, [])?;
        drop(conn);

        let db = Self { pool };
        db.rebuild_fts()?;
        Ok(db)
    }

    fn conn(&self) -> Result<PooledConn, PalaverError> {
        self.pool
            .get()
            .map_err(|e| PalaverError::Internal(format!("pool: {e}")))
    }

    /// Database file size in bytes (via SQLite pragma).
    pub fn db_size_bytes(&self) -> i64 {
        self.conn()
            .and_then(|c| {
                c.query_row(
                    "SELECT page_count * page_size FROM pragma_page_count, pragma_page_size",
                    [],
                    |r| r.get(0),
                )
                .map_err(PalaverError::from)
            })
            .unwrap_or(0)
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        role: row.get("role")?,
        content: row.get("content")?,
        length: row.get("length")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
