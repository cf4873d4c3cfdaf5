//! Tenant session access: maps chat-platform ids onto store rows and
//! stored envelopes onto the wire shape the LLM client expects.

use std::sync::Arc;

use tracing::{error, info};

use crate::db::{ChatDB, Message, Role};
use crate::envelope::MessageContent;
use crate::error::PalaverError;
use crate::llm::{ContentPart, LlmClient, Turn, TurnContent};
use crate::{blocking, SharedDB};

/// Reply used when the language model fails after retries. The user's
/// turn stays persisted; failures are not rolled back.
pub const APOLOGY: &str = "Sorry, something went wrong. Please try again later.";

#[derive(Clone)]
pub struct SessionStore {
    db: SharedDB,
}

impl SessionStore {
    pub fn new(db: SharedDB) -> Self {
        Self { db }
    }

    /// Ordered conversation history for a tenant, decoded to the wire
    /// shape. Creates the tenant on first contact.
    pub fn session(&self, telegram_id: i64) -> Result<Vec<Turn>, PalaverError> {
        let user_id = self.db.get_or_create_user(telegram_id)?;
        let messages = self.db.list_messages(user_id)?;
        Ok(messages.into_iter().map(to_turn).collect())
    }

    /// Encode and persist one turn.
    pub fn add_message(
        &self,
        telegram_id: i64,
        role: Role,
        text: String,
        image_base64: Option<String>,
    ) -> Result<Message, PalaverError> {
        let user_id = self.db.get_or_create_user(telegram_id)?;
        let content = match image_base64 {
            Some(image_base64) => MessageContent::TextWithImage { text, image_base64 },
            None => MessageContent::Text(text),
        };
        self.db.add_message(user_id, role, &content.encode())
    }

    /// Soft-delete the tenant's history. Returns the number of turns
    /// cleared; clearing an empty history is a no-op.
    pub fn clear(&self, telegram_id: i64) -> Result<usize, PalaverError> {
        let user_id = self.db.get_or_create_user(telegram_id)?;
        self.db.clear_messages(user_id)
    }

    /// One full conversational turn: persist the user message, send the
    /// whole history to the model, persist and return the reply.
    ///
    /// The model call happens outside any store transaction. Final
    /// failure degrades to a fixed apology; the user turn is kept.
    pub async fn converse(
        &self,
        llm: &LlmClient,
        telegram_id: i64,
        text: String,
        image_base64: Option<String>,
    ) -> Result<String, PalaverError> {
        let store = self.clone();
        let (user_text, user_image) = (text.clone(), image_base64.clone());
        blocking(move || store.add_message(telegram_id, Role::User, user_text, user_image))
            .await??;

        let store = self.clone();
        let history = blocking(move || store.session(telegram_id)).await??;

        info!(telegram_id, turns = history.len(), "forwarding session to LLM");
        match llm.chat(&history).await {
            Ok(reply) => {
                let store = self.clone();
                let stored = reply.clone();
                blocking(move || {
                    store.add_message(telegram_id, Role::Assistant, stored, None)
                })
                .await??;
                Ok(reply)
            }
            Err(e) => {
                error!(telegram_id, error = %e, "LLM call failed for session");
                Ok(APOLOGY.to_string())
            }
        }
    }

    pub fn db(&self) -> &Arc<ChatDB> {
        &self.db
    }
}

fn to_turn(message: Message) -> Turn {
    let content = match MessageContent::decode(&message.content) {
        MessageContent::Text(text) => TurnContent::Text(text),
        MessageContent::TextWithImage { text, image_base64 } => {
            let mut parts = Vec::with_capacity(2);
            if !text.is_empty() {
                parts.push(ContentPart::Text { text });
            }
            parts.push(ContentPart::Image { data: image_base64 });
            TurnContent::Parts(parts)
        }
    };
    Turn {
        role: message.role,
        content,
    }
}
