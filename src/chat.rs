//! Dashboard chat: ephemeral assistant sessions with a normal mode and
//! an admin mode that grounds the model in live store statistics.
//!
//! These sessions are scratchpads keyed by UUID, not tenant history.
//! Tenant conversations live only in the store.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::db::{iso_hours_ago, ChatDB, Role};
use crate::error::PalaverError;
use crate::llm::{LlmClient, Turn, TurnContent};
use crate::SharedDB;

/// Reply used when the model fails after retries; the turn handler
/// never surfaces a 5xx for a backend failure.
pub const CHAT_APOLOGY: &str = "Sorry, something went wrong while handling your request.";

pub const ADMIN_PROMPT: &str = "\
You are an assistant helping an administrator analyze chat-bot usage statistics.

The database contains:
- table users: id, telegram_id, created_at, deleted_at
- table messages: id, user_id, role (user/assistant), content, length, created_at, deleted_at

You help the administrator:
- interpret the statistics
- answer questions about user activity
- suggest ways to analyze the data

Answer briefly and to the point.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Normal,
    Admin,
}

struct ChatSession {
    mode: ChatMode,
    turns: Vec<Turn>,
}

pub struct ChatService {
    db: SharedDB,
    sessions: Mutex<HashMap<String, ChatSession>>,
}

impl ChatService {
    pub fn new(db: SharedDB) -> Self {
        Self {
            db,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one dashboard chat message. Returns (reply, session_id).
    /// An unknown or absent session id starts a fresh session.
    pub async fn process(
        &self,
        llm: &LlmClient,
        message: String,
        mode: ChatMode,
        session_id: Option<String>,
    ) -> (String, String) {
        let (sid, history) = {
            let mut sessions = self.sessions.lock();
            let sid = session_id
                .filter(|id| sessions.contains_key(id))
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let session = sessions.entry(sid.clone()).or_insert_with(|| {
                info!(session_id = %sid, ?mode, "new dashboard chat session");
                ChatSession {
                    mode,
                    turns: Vec::new(),
                }
            });
            session.mode = mode;
            session.turns.push(Turn {
                role: Role::User,
                content: TurnContent::Text(message),
            });
            (sid, session.turns.clone())
        };

        let result = match mode {
            ChatMode::Normal => llm.chat(&history).await,
            ChatMode::Admin => {
                let db = self.db.clone();
                let context = tokio::task::spawn_blocking(move || stats_context(&db))
                    .await
                    .map_err(|e| PalaverError::Internal(e.to_string()))
                    .and_then(|r| r)
                    .unwrap_or_else(|e| {
                        error!(error = %e, "stats context unavailable for admin chat");
                        "Statistics are temporarily unavailable.".to_string()
                    });
                let system = format!(
                    "{ADMIN_PROMPT}\n\nCurrent statistics from the database:\n{context}\n\n\
                     Use these figures when answering."
                );
                llm.chat_with_system(&system, &history).await
            }
        };

        match result {
            Ok(reply) => {
                let mut sessions = self.sessions.lock();
                if let Some(session) = sessions.get_mut(&sid) {
                    session.turns.push(Turn {
                        role: Role::Assistant,
                        content: TurnContent::Text(reply.clone()),
                    });
                    info!(
                        session_id = %sid,
                        ?mode,
                        reply_len = reply.len(),
                        "dashboard chat turn handled"
                    );
                }
                (reply, sid)
            }
            Err(e) => {
                error!(session_id = %sid, error = %e, "dashboard chat failed");
                (CHAT_APOLOGY.to_string(), sid)
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

/// Plain-text snapshot of the store for the admin system prompt.
fn stats_context(db: &ChatDB) -> Result<String, PalaverError> {
    let total_users = db.count_users()?;
    let total_messages = db.count_messages()?;
    let active_today = db.active_since(&iso_hours_ago(24))?;
    let avg_length = db.avg_message_length()?;
    let roles = db.role_counts()?;

    let mut text = format!(
        "- Total users: {total_users}\n\
         - Total messages: {total_messages}\n\
         - Active users in the last 24 hours: {active_today}\n\
         - Average message length: {avg_length:.1} characters\n\
         - Messages by role:"
    );
    for (role, count) in roles {
        text.push_str(&format!("\n  - {}: {count} messages", role.as_str()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn stats_context_renders_role_lines() {
        let db = Arc::new(ChatDB::open(":memory:").unwrap());
        let uid = db.get_or_create_user(1).unwrap();
        db.add_message(uid, Role::User, "hi").unwrap();
        db.add_message(uid, Role::Assistant, "hello there").unwrap();

        let ctx = stats_context(&db).unwrap();
        assert!(ctx.contains("Total users: 1"));
        assert!(ctx.contains("Total messages: 2"));
        assert!(ctx.contains("- user: 1 messages"));
        assert!(ctx.contains("- assistant: 1 messages"));
        assert!(ctx.contains("Average message length: 6.5"));
    }
}
