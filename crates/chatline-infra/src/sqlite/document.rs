//! SQLite document ownership lookups.
//!
//! Documents are versioned: every save inserts a new `(id, created_at)` row.
//! Only the newest version is consulted for ownership.

use chatline_core::repository::document::DocumentRepository;
use chatline_types::document::Document;
use chatline_types::error::RepositoryError;
use chrono::{SubsecRound, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `DocumentRepository`.
pub struct SqliteDocumentRepository {
    pool: DatabasePool,
}

impl SqliteDocumentRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Save a version of a document. Pass `None` as `id` to start a new one.
    pub async fn save_version(
        &self,
        id: Option<Uuid>,
        owner_id: &Uuid,
        title: &str,
    ) -> Result<Document, RepositoryError> {
        let document = Document {
            id: id.unwrap_or_else(Uuid::now_v7),
            owner_id: *owner_id,
            title: title.to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };

        sqlx::query("INSERT INTO documents (id, owner_id, title, created_at) VALUES (?, ?, ?, ?)")
            .bind(document.id.to_string())
            .bind(owner_id.to_string())
            .bind(&document.title)
            .bind(format_datetime(&document.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(document)
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(query_error)?;
    let title: String = row.try_get("title").map_err(query_error)?;
    let created_at: String = row.try_get("created_at").map_err(query_error)?;

    Ok(Document {
        id: parse_uuid(&id, "document id")?,
        owner_id: parse_uuid(&owner_id, "owner_id")?,
        title,
        created_at: parse_datetime(&created_at)?,
    })
}

impl DocumentRepository for SqliteDocumentRepository {
    async fn get_document(&self, document_id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT id, owner_id, title, created_at FROM documents
               WHERE id = ?
               ORDER BY created_at DESC LIMIT 1"#,
        )
        .bind(document_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|row| row_to_document(&row)).transpose()
    }
}
