//! Content envelope: how a turn's content is encoded into the single
//! text column of the message table.
//!
//! Text-only turns are stored as the bare string, so stored lengths and
//! previews operate on the visible text and rows written before the
//! envelope existed decode unchanged. Turns carrying an image are
//! stored as a versioned JSON object. Anything that fails envelope
//! decoding is read back as plain text, never an error.

use serde::{Deserialize, Serialize};

const ENVELOPE_VERSION: u32 = 1;

/// Decoded content of a stored turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    TextWithImage { text: String, image_base64: String },
}

#[derive(Serialize, Deserialize)]
struct ImageEnvelope {
    v: u32,
    kind: String,
    text: String,
    image: String,
}

impl MessageContent {
    /// Stable column encoding. `Text` is the identity; the image form
    /// is a versioned JSON object.
    pub fn encode(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::TextWithImage { text, image_base64 } => {
                let env = ImageEnvelope {
                    v: ENVELOPE_VERSION,
                    kind: "image".into(),
                    text: text.clone(),
                    image: image_base64.clone(),
                };
                serde_json::to_string(&env).unwrap_or_else(|_| text.clone())
            }
        }
    }

    /// Decode a stored column value. Falls back to plain text on any
    /// shape mismatch.
    pub fn decode(raw: &str) -> MessageContent {
        if raw.starts_with('{') {
            if let Ok(env) = serde_json::from_str::<ImageEnvelope>(raw) {
                if env.kind == "image" {
                    return MessageContent::TextWithImage {
                        text: env.text,
                        image_base64: env.image,
                    };
                }
            }
        }
        MessageContent::Text(raw.to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            MessageContent::Text(text) | MessageContent::TextWithImage { text, .. } => text,
        }
    }
}

/// The human-readable portion of a stored column value, for indexing
/// and previews. Image payloads never pass through here.
pub fn searchable_text(raw: &str) -> String {
    match MessageContent::decode(raw) {
        MessageContent::Text(text) | MessageContent::TextWithImage { text, .. } => text,
    }
}
