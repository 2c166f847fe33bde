//! MessageRepository trait definition: the chat's append-only history.

use chatline_types::error::RepositoryError;
use chatline_types::message::{Attachment, Message, MessageRole};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Default cap on the number of messages forwarded as generation context.
pub const DEFAULT_CONTEXT_LIMIT: u32 = 50;

/// Repository trait for the message history of chats.
///
/// Messages are never edited or deleted individually. `created_at` is
/// strictly increasing within a chat: implementations nudge a timestamp that
/// would tie with (or precede) the chat's newest message forward by one
/// microsecond.
pub trait MessageRepository: Send + Sync {
    /// Append a turn. Pure insertion, duplicates are never rejected.
    fn append(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: String,
        attachments: Vec<Attachment>,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// The newest `limit` messages of a chat, ordered by created_at ASC.
    ///
    /// Read-only: never mutates anything as a side effect.
    fn recent_context(
        &self,
        chat_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Page through a chat's messages, ordered by created_at ASC.
    fn list_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Get one message, only if it belongs to the given chat.
    fn get_message(
        &self,
        chat_id: &Uuid,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// The newest assistant message created at or after `since`.
    fn latest_assistant_since(
        &self,
        chat_id: &Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Remove every message of a chat. Returns the number removed.
    fn delete_all(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
