//! Generation request/response types for Chatline.
//!
//! These types model the boundary with the text-generation engine: an ordered
//! list of role-tagged messages goes in, a stream of text fragments and an
//! optional usage report comes out.

use serde::{Deserialize, Serialize};

use crate::message::{ContentPart, Message, MessageRole};

/// One entry of the context handed to the generation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: MessageRole,
    pub parts: Vec<ContentPart>,
}

impl From<&Message> for ContextMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            parts: message.parts.clone(),
        }
    }
}

/// Request to a generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Provider-side model name (already resolved from the public model id).
    pub model: String,
    /// Ordered context, oldest first.
    pub messages: Vec<ContextMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Token usage reported by a provider at the end of a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Events emitted by a streaming generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// One incremental unit of generated text.
    Fragment { text: String },

    /// Token usage, sent at most once after the last fragment.
    Usage(Usage),
}

/// Errors from generation provider operations.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("malformed provider output: {0}")]
    Malformed(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Public description of a configured model, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier clients send as `selectedChatModel`.
    pub id: String,
    /// Provider backend name (e.g., "openai", "azure").
    pub provider: String,
    /// Provider-side model name.
    pub model: String,
}
