//! Chat and vote types for Chatline.
//!
//! A chat is a persisted conversation thread owned by exactly one user.
//! Votes are per-message feedback with upsert semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who besides the owner may read a chat.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (visibility IN ('private', 'public'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(format!("invalid visibility: '{other}'")),
        }
    }
}

/// Token accounting recorded after the most recent completed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUsage {
    pub total_tokens: u32,
}

/// A conversation thread.
///
/// `owner_id` is immutable after creation. `last_usage` is replaced after
/// every completed generation that reported usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub visibility: Visibility,
    pub last_usage: Option<ChatUsage>,
    pub created_at: DateTime<Utc>,
}

/// Up/down feedback on one message, unique per `(chat_id, message_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub is_upvoted: bool,
}

/// Derive a chat title from the first user message.
///
/// Takes the first `max_chars` characters (not bytes) of the trimmed text.
/// Falls back to "New Chat" when the message has no text.
pub fn derive_title(message: &str, max_chars: usize) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return "New Chat".to_string();
    }
    trimmed.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_roundtrip() {
        for v in [Visibility::Private, Visibility::Public] {
            let parsed: Visibility = v.to_string().parse().unwrap();
            assert_eq!(v, parsed);
        }
        assert!("secret".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_visibility_default_is_private() {
        assert_eq!(Visibility::default(), Visibility::Private);
    }

    #[test]
    fn test_derive_title_truncates_on_char_boundary() {
        let title = derive_title("héllo wörld", 4);
        assert_eq!(title, "héll");
        assert_eq!(derive_title("   ", 100), "New Chat");
        assert_eq!(derive_title("  short  ", 100), "short");
    }

    #[test]
    fn test_chat_serializes_camel_case() {
        let chat = Chat {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            title: "hello".to_string(),
            visibility: Visibility::Private,
            last_usage: Some(ChatUsage { total_tokens: 12 }),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&chat).unwrap();
        assert!(json.contains("\"ownerId\""));
        assert!(json.contains("\"lastUsage\":{\"totalTokens\":12}"));
        assert!(json.contains("\"visibility\":\"private\""));
    }
}
