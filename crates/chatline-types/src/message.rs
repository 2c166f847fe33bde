//! Message types for Chatline.
//!
//! Messages are append-only turns within a chat. Their body is a list of
//! typed content parts rather than an untyped JSON bag, so that context
//! assembly can match on every kind of part.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Author of a persisted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A file attached to a user turn, referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub media_type: String,
}

/// One piece of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Attachment(Attachment),
}

/// A single persisted turn.
///
/// Messages are ordered by `created_at` within a chat; that order is the
/// context order fed to the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub parts: Vec<ContentPart>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build the part list for a turn: the text first (when non-empty), then
    /// the attachments in the order given.
    pub fn compose_parts(content: String, attachments: Vec<Attachment>) -> Vec<ContentPart> {
        let mut parts = Vec::with_capacity(attachments.len() + 1);
        if !content.is_empty() {
            parts.push(ContentPart::Text { text: content });
        }
        parts.extend(attachments.into_iter().map(ContentPart::Attachment));
        parts
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Attachment(_) => None,
            })
            .collect()
    }

    /// Attachments of this message, in order.
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.parts.iter().filter_map(|p| match p {
            ContentPart::Attachment(a) => Some(a),
            ContentPart::Text { .. } => None,
        })
    }
}
