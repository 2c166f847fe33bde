//! ChatRepository trait definition.
//!
//! Provides persistence for chats and their votes, plus the cascading
//! delete that removes every row belonging to a chat.

use chatline_types::chat::{Chat, ChatUsage, Visibility, Vote};
use chatline_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat and vote persistence.
///
/// Implementations live in chatline-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Insert a new chat. Returns `Conflict` if the id is already taken.
    fn create_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Get a chat by its unique ID.
    fn get_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// List the chats owned by a user, ordered by created_at DESC.
    fn list_chats(
        &self,
        owner_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    /// Change who may read a chat.
    fn update_visibility(
        &self,
        chat_id: &Uuid,
        visibility: Visibility,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the usage recorded for the most recent generation.
    fn update_last_usage(
        &self,
        chat_id: &Uuid,
        usage: ChatUsage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a chat and everything that belongs to it.
    ///
    /// Runs as one transaction removing, in order: votes, stream handles,
    /// messages, and finally the chat row. Returns `NotFound` if the chat
    /// does not exist.
    fn delete_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert or update the vote for `(chat_id, message_id)`.
    fn upsert_vote(
        &self,
        vote: &Vote,
    ) -> impl std::future::Future<Output = Result<Vote, RepositoryError>> + Send;

    /// Get all votes cast on a chat's messages.
    fn list_votes(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Vote>, RepositoryError>> + Send;
}
