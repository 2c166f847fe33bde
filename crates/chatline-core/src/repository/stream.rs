//! StreamRepository trait definition: the registry of generation attempts.

use chatline_types::error::RepositoryError;
use chatline_types::stream::StreamHandle;
use uuid::Uuid;

/// Repository trait for stream handles.
///
/// The registry never stores generated output; a handle only records that
/// an attempt happened and when.
pub trait StreamRepository: Send + Sync {
    /// Create and persist a new handle for a chat.
    fn open(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<StreamHandle, RepositoryError>> + Send;

    /// The most recent handle for a chat, if any.
    fn latest(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<StreamHandle>, RepositoryError>> + Send;
}
