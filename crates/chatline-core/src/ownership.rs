//! Ownership guard.
//!
//! Every read or mutation of a chat (and everything hanging off it) or of a
//! document first asks the guard whether the caller may touch it. The answer
//! is three-way: a record that never existed is reported differently from a
//! record that exists but belongs to someone else, so that callers can pick
//! the right user-facing error and never create over another user's id.

use std::sync::Arc;

use chatline_types::chat::{Chat, Visibility};
use chatline_types::document::Document;
use chatline_types::error::{ChatError, RepositoryError};
use chatline_types::user::AuthContext;
use uuid::Uuid;

use crate::repository::chat::ChatRepository;
use crate::repository::document::DocumentRepository;

/// A resource whose ownership can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Chat(Uuid),
    Document(Uuid),
}

/// What the caller intends to do with the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read-only; public chats are readable by anyone.
    Read,
    /// Any mutation; only the owner qualifies.
    Write,
}

/// Verdict of an ownership check, carrying the record when authorized.
#[derive(Debug, Clone)]
pub enum Ownership<T> {
    Authorized(T),
    NotFound,
    Forbidden,
}

impl<T> Ownership<T> {
    #[cfg(test)]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Ownership::Authorized(_))
    }

    /// Convert into a `Result`, naming the resource kind in the error.
    pub fn into_result(self, kind: &'static str) -> Result<T, ChatError> {
        match self {
            Ownership::Authorized(record) => Ok(record),
            Ownership::NotFound => Err(ChatError::NotFound(kind)),
            Ownership::Forbidden => Err(ChatError::Forbidden(kind)),
        }
    }

    fn discard(self) -> Ownership<()> {
        match self {
            Ownership::Authorized(_) => Ownership::Authorized(()),
            Ownership::NotFound => Ownership::NotFound,
            Ownership::Forbidden => Ownership::Forbidden,
        }
    }
}

/// Checks caller ownership of chats and documents.
pub struct OwnershipGuard<C, D> {
    chats: Arc<C>,
    documents: Arc<D>,
}

impl<C, D> Clone for OwnershipGuard<C, D> {
    fn clone(&self) -> Self {
        Self {
            chats: Arc::clone(&self.chats),
            documents: Arc::clone(&self.documents),
        }
    }
}

impl<C: ChatRepository, D: DocumentRepository> OwnershipGuard<C, D> {
    pub fn new(chats: Arc<C>, documents: Arc<D>) -> Self {
        Self { chats, documents }
    }

    /// Check access to any resource kind.
    pub async fn check(
        &self,
        caller: &AuthContext,
        resource: ResourceRef,
        access: Access,
    ) -> Result<Ownership<()>, RepositoryError> {
        match resource {
            ResourceRef::Chat(id) => Ok(self.check_chat(caller, &id, access).await?.discard()),
            ResourceRef::Document(id) => Ok(self.check_document(caller, &id).await?.discard()),
        }
    }

    /// Check access to a chat, returning it when authorized.
    pub async fn check_chat(
        &self,
        caller: &AuthContext,
        chat_id: &Uuid,
        access: Access,
    ) -> Result<Ownership<Chat>, RepositoryError> {
        let Some(chat) = self.chats.get_chat(chat_id).await? else {
            return Ok(Ownership::NotFound);
        };

        if chat.owner_id == caller.user_id {
            return Ok(Ownership::Authorized(chat));
        }
        if access == Access::Read && chat.visibility == Visibility::Public {
            return Ok(Ownership::Authorized(chat));
        }

        tracing::debug!(
            chat_id = %chat_id,
            caller = %caller.user_id,
            ?access,
            "Chat access denied"
        );
        Ok(Ownership::Forbidden)
    }

    /// Check access to a document, returning it when authorized.
    ///
    /// Documents have no public visibility; only the owner qualifies.
    pub async fn check_document(
        &self,
        caller: &AuthContext,
        document_id: &Uuid,
    ) -> Result<Ownership<Document>, RepositoryError> {
        match self.documents.get_document(document_id).await? {
            None => Ok(Ownership::NotFound),
            Some(doc) if doc.owner_id == caller.user_id => Ok(Ownership::Authorized(doc)),
            Some(_) => Ok(Ownership::Forbidden),
        }
    }
}
