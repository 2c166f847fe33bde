//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `chatline-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reads on the reader
//! pool and every mutation on the writer.

use chatline_core::repository::chat::ChatRepository;
use chatline_types::chat::{Chat, ChatUsage, Visibility, Vote};
use chatline_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::message::delete_messages;
use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, push_pagination, query_error};

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Chat.
struct ChatRow {
    id: String,
    owner_id: String,
    title: String,
    visibility: String,
    last_usage_tokens: Option<i64>,
    created_at: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            visibility: row.try_get("visibility")?,
            last_usage_tokens: row.try_get("last_usage_tokens")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let visibility: Visibility = self
            .visibility
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Chat {
            id: parse_uuid(&self.id, "chat id")?,
            owner_id: parse_uuid(&self.owner_id, "owner_id")?,
            title: self.title,
            visibility,
            last_usage: self.last_usage_tokens.map(|t| ChatUsage {
                total_tokens: t as u32,
            }),
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn row_to_vote(row: &sqlx::sqlite::SqliteRow) -> Result<Vote, RepositoryError> {
    let chat_id: String = row.try_get("chat_id").map_err(query_error)?;
    let message_id: String = row.try_get("message_id").map_err(query_error)?;
    let is_upvoted: bool = row.try_get("is_upvoted").map_err(query_error)?;

    Ok(Vote {
        chat_id: parse_uuid(&chat_id, "chat_id")?,
        message_id: parse_uuid(&message_id, "message_id")?,
        is_upvoted,
    })
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO chats (id, owner_id, title, visibility, last_usage_tokens, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(chat.id.to_string())
        .bind(chat.owner_id.to_string())
        .bind(&chat.title)
        .bind(chat.visibility.to_string())
        .bind(chat.last_usage.map(|u| u.total_tokens as i64))
        .bind(format_datetime(&chat.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(chat.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("chat {} already exists", chat.id)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let chat_row = ChatRow::from_row(&row).map_err(query_error)?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn list_chats(
        &self,
        owner_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, RepositoryError> {
        let mut sql =
            String::from("SELECT * FROM chats WHERE owner_id = ? ORDER BY created_at DESC, id DESC");
        push_pagination(&mut sql, limit, offset);

        let rows = sqlx::query(&sql)
            .bind(owner_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            let chat_row = ChatRow::from_row(row).map_err(query_error)?;
            chats.push(chat_row.into_chat()?);
        }

        Ok(chats)
    }

    async fn update_visibility(
        &self,
        chat_id: &Uuid,
        visibility: Visibility,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chats SET visibility = ? WHERE id = ?")
            .bind(visibility.to_string())
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn update_last_usage(
        &self,
        chat_id: &Uuid,
        usage: ChatUsage,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chats SET last_usage_tokens = ? WHERE id = ?")
            .bind(usage.total_tokens as i64)
            .bind(chat_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), RepositoryError> {
        let id = chat_id.to_string();
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        // Children first: foreign keys are enforced.
        for sql in [
            "DELETE FROM votes WHERE chat_id = ?",
            "DELETE FROM stream_handles WHERE chat_id = ?",
        ] {
            sqlx::query(sql)
                .bind(&id)
                .execute(&mut *tx)
                .await
                .map_err(query_error)?;
        }
        delete_messages(&mut tx, chat_id).await?;

        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn upsert_vote(&self, vote: &Vote) -> Result<Vote, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO votes (chat_id, message_id, is_upvoted) VALUES (?, ?, ?)
               ON CONFLICT (chat_id, message_id) DO UPDATE SET is_upvoted = excluded.is_upvoted"#,
        )
        .bind(vote.chat_id.to_string())
        .bind(vote.message_id.to_string())
        .bind(vote.is_upvoted)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(vote.clone())
    }

    async fn list_votes(&self, chat_id: &Uuid) -> Result<Vec<Vote>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM votes WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter().map(row_to_vote).collect()
    }
}
