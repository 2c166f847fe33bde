use thiserror::Error;

use crate::llm::GenerationError;

/// Errors from repository operations (used by trait definitions in chatline-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by chat operations.
///
/// `NotFound`, `Forbidden`, `BadRequest` and `Busy` are always raised before
/// any provider call. `ProviderFailure` only reaches callers in-band, as a
/// terminal error frame on an already started stream.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} belongs to another user")]
    Forbidden(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("another generation is running on this chat")]
    Busy,

    #[error("generation failed: {0}")]
    ProviderFailure(String),

    #[error("storage failure: {0}")]
    StoreFailure(#[from] RepositoryError),
}

impl From<GenerationError> for ChatError {
    fn from(e: GenerationError) -> Self {
        ChatError::ProviderFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::NotFound("chat").to_string(), "chat not found");
        assert_eq!(
            ChatError::Forbidden("chat").to_string(),
            "chat belongs to another user"
        );
    }

    #[test]
    fn test_chat_error_from_repository_error() {
        let err: ChatError = RepositoryError::Connection.into();
        assert!(matches!(err, ChatError::StoreFailure(RepositoryError::Connection)));
    }

    #[test]
    fn test_chat_error_from_generation_error() {
        let err: ChatError = GenerationError::Stream("reset".to_string()).into();
        assert!(matches!(err, ChatError::ProviderFailure(ref m) if m.contains("reset")));
    }
}
