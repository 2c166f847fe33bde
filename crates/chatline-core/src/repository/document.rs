use chatline_types::document::Document;
use chatline_types::error::RepositoryError;
use uuid::Uuid;

/// Read-only lookup of documents, used for ownership checks.
pub trait DocumentRepository: Send + Sync {
    /// Get the latest version of a document by ID.
    fn get_document(
        &self,
        document_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Document>, RepositoryError>> + Send;
}
