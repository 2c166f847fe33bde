//! Stream handle and live output frame types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// Record of one generation attempt on a chat.
///
/// Opened before the provider is called so that a client which disconnects
/// immediately can still discover that a generation was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamHandle {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One frame on the live response channel.
///
/// A stream is zero or more `Content` frames followed by either the end of
/// the stream or exactly one `Error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Content { text: String },
    Error { message: String },
}

impl StreamFrame {
    pub fn content(text: impl Into<String>) -> Self {
        StreamFrame::Content { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamFrame::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::Error { .. })
    }
}

/// Result of asking to resume a chat's stream.
#[derive(Debug, Clone)]
pub enum ResumeOutcome {
    /// No attempt was ever made, or the latest attempt failed without a reply.
    Nothing,
    /// The latest attempt is still generating.
    InProgress(StreamHandle),
    /// The latest attempt committed this assistant message.
    Completed {
        handle: StreamHandle,
        message: Message,
    },
}
