//! SQLite stream handle registry.

use chatline_core::repository::stream::StreamRepository;
use chatline_types::error::RepositoryError;
use chatline_types::stream::StreamHandle;
use chrono::{SubsecRound, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `StreamRepository`.
pub struct SqliteStreamRepository {
    pool: DatabasePool,
}

impl SqliteStreamRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_handle(row: &sqlx::sqlite::SqliteRow) -> Result<StreamHandle, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let chat_id: String = row.try_get("chat_id").map_err(query_error)?;
    let created_at: String = row.try_get("created_at").map_err(query_error)?;

    Ok(StreamHandle {
        id: parse_uuid(&id, "stream id")?,
        chat_id: parse_uuid(&chat_id, "chat_id")?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl StreamRepository for SqliteStreamRepository {
    async fn open(&self, chat_id: &Uuid) -> Result<StreamHandle, RepositoryError> {
        let handle = StreamHandle {
            id: Uuid::now_v7(),
            chat_id: *chat_id,
            created_at: Utc::now().trunc_subsecs(6),
        };

        sqlx::query("INSERT INTO stream_handles (id, chat_id, created_at) VALUES (?, ?, ?)")
            .bind(handle.id.to_string())
            .bind(chat_id.to_string())
            .bind(format_datetime(&handle.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        tracing::debug!(chat_id = %chat_id, stream_id = %handle.id, "Stream handle opened");
        Ok(handle)
    }

    async fn latest(&self, chat_id: &Uuid) -> Result<Option<StreamHandle>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT id, chat_id, created_at FROM stream_handles
               WHERE chat_id = ?
               ORDER BY created_at DESC, id DESC LIMIT 1"#,
        )
        .bind(chat_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|row| row_to_handle(&row)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::chat::SqliteChatRepository;
    use crate::sqlite::test_support::{make_user, test_pool};
    use chatline_core::repository::chat::ChatRepository;
    use chatline_types::chat::{Chat, Visibility};

    async fn setup() -> (SqliteStreamRepository, Uuid) {
        let pool = test_pool().await;
        let owner = make_user(&pool, "ada@example.com").await;
        let chat = Chat {
            id: Uuid::now_v7(),
            owner_id: owner.id,
            title: "t".to_string(),
            visibility: Visibility::Private,
            last_usage: None,
            created_at: Utc::now(),
        };
        SqliteChatRepository::new(pool.clone())
            .create_chat(&chat)
            .await
            .unwrap();
        (SqliteStreamRepository::new(pool), chat.id)
    }

    #[tokio::test]
    async fn test_latest_is_none_without_handles() {
        let (repo, chat_id) = setup().await;
        assert!(repo.latest(&chat_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_returns_newest_handle() {
        let (repo, chat_id) = setup().await;
        repo.open(&chat_id).await.unwrap();
        let second = repo.open(&chat_id).await.unwrap();

        let latest = repo.latest(&chat_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_open_for_missing_chat_fails() {
        let (repo, _) = setup().await;
        assert!(repo.open(&Uuid::now_v7()).await.is_err());
    }
}
