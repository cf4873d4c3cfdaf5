//! OpenAI-compatible chat-completions client.
//!
//! The only retry policy in the system lives here: transient backend
//! failures get a bounded number of attempts with linear backoff, and
//! the final failure is surfaced to the caller. Storage is never held
//! open across a call.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::db::Role;
use crate::error::PalaverError;

const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 3;

/// Linear backoff: 2s after the first failure, 4s after the second.
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt) * 2)
}

fn llm_err(msg: impl Into<String>) -> PalaverError {
    PalaverError::LlmBackend(msg.into())
}

/// One turn in the wire shape the completions API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

/// Plain text, or an ordered list of typed parts for turns carrying an
/// attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text { text: String },
    Image { data: String },
}

pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: WireContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireContent<'a> {
    Text(&'a str),
    Turn(&'a TurnContent),
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            client,
        }
    }

    /// Returns `None` if `PALAVER_LLM_URL` is not set. The system
    /// prompt file is only read (and required) when the backend is
    /// configured.
    pub fn from_env(prompt_path: &std::path::Path) -> Option<Self> {
        let base_url = std::env::var("PALAVER_LLM_URL").ok()?;
        let model =
            std::env::var("PALAVER_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        let api_key = std::env::var("PALAVER_LLM_KEY").unwrap_or_default();
        let system_prompt = std::fs::read_to_string(prompt_path)
            .unwrap_or_else(|e| panic!("failed to read system prompt file {prompt_path:?}: {e}"));
        Some(Self::new(base_url, model, api_key, system_prompt))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Completion over a conversation history, using the configured
    /// system prompt.
    pub async fn chat(&self, history: &[Turn]) -> Result<String, PalaverError> {
        self.chat_with_system(&self.system_prompt, history).await
    }

    /// Completion with an explicit system prompt (the admin chat swaps
    /// in its own). Retries transient failures with linear backoff,
    /// then surfaces the last error.
    pub async fn chat_with_system(
        &self,
        system: &str,
        history: &[Turn],
    ) -> Result<String, PalaverError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request(system, history).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(error = %e, attempt, "LLM call failed, retrying");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request(&self, system: &str, history: &[Turn]) -> Result<String, PalaverError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: WireContent::Text(system),
        });
        for turn in history {
            messages.push(WireMessage {
                role: turn.role.as_str(),
                content: WireContent::Turn(&turn.content),
            });
        }
        let req = ChatRequest {
            model: &self.model,
            messages,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&req);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| llm_err(format!("LLM request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(llm_err(format!("LLM returned {status}: {body}")));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| llm_err(format!("LLM response parse failed: {e}")))?;
        Ok(chat
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear() {
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn turn_content_wire_shapes() {
        let text = Turn {
            role: Role::User,
            content: TurnContent::Text("hi".into()),
        };
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            serde_json::json!({"role": "user", "content": "hi"})
        );

        let parts = Turn {
            role: Role::User,
            content: TurnContent::Parts(vec![
                ContentPart::Text { text: "look".into() },
                ContentPart::Image { data: "QUJD".into() },
            ]),
        };
        assert_eq!(
            serde_json::to_value(&parts).unwrap(),
            serde_json::json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "look"},
                    {"type": "image", "data": "QUJD"},
                ]
            })
        );
    }
}
