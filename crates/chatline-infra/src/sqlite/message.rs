//! SQLite message history.
//!
//! Message parts are stored as a JSON array of tagged `ContentPart` values.
//! `created_at` is kept strictly increasing per chat: `append` reads the
//! chat's newest timestamp inside a writer transaction and nudges the new
//! one forward by a microsecond when the clock would tie or go backwards.

use chatline_core::repository::message::MessageRepository;
use chatline_types::error::RepositoryError;
use chatline_types::message::{Attachment, ContentPart, Message, MessageRole};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteConnection;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, push_pagination, query_error};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    chat_id: String,
    role: String,
    parts: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            parts: row.try_get("parts")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let parts: Vec<ContentPart> = serde_json::from_str(&self.parts)
            .map_err(|e| RepositoryError::Query(format!("invalid message parts: {e}")))?;

        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            role,
            parts,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn rows_to_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Message>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let msg_row = MessageRow::from_row(row).map_err(query_error)?;
        messages.push(msg_row.into_message()?);
    }
    Ok(messages)
}

/// Remove every message of a chat on `conn`.
///
/// Shared by `delete_all` and the chat-deletion transaction, which passes
/// its transaction so the removal commits or rolls back with the chat row.
pub(crate) async fn delete_messages(
    conn: &mut SqliteConnection,
    chat_id: &Uuid,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM messages WHERE chat_id = ?")
        .bind(chat_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(query_error)?;

    Ok(result.rows_affected())
}

impl MessageRepository for SqliteMessageRepository {
    async fn append(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: String,
        attachments: Vec<Attachment>,
    ) -> Result<Message, RepositoryError> {
        let parts = Message::compose_parts(content, attachments);
        let parts_json = serde_json::to_string(&parts)
            .map_err(|e| RepositoryError::Query(format!("failed to encode parts: {e}")))?;

        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let newest: Option<String> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM messages WHERE chat_id = ?")
                .bind(chat_id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(query_error)?;

        let mut created_at = Utc::now().trunc_subsecs(6);
        if let Some(newest) = newest.as_deref().map(parse_datetime).transpose()?
            && created_at <= newest
        {
            created_at = newest + Duration::microseconds(1);
        }

        let message = Message {
            id: Uuid::now_v7(),
            chat_id,
            role,
            parts,
            created_at,
        };

        sqlx::query(
            "INSERT INTO messages (id, chat_id, role, parts, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(chat_id.to_string())
        .bind(role.to_string())
        .bind(&parts_json)
        .bind(format_datetime(&message.created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;

        tracing::debug!(chat_id = %chat_id, message_id = %message.id, %role, "Message appended");
        Ok(message)
    }

    async fn recent_context(
        &self,
        chat_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM (
                   SELECT * FROM messages WHERE chat_id = ? ORDER BY created_at DESC LIMIT ?
               ) ORDER BY created_at ASC"#,
        )
        .bind(chat_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows_to_messages(&rows)
    }

    async fn list_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut sql =
            String::from("SELECT * FROM messages WHERE chat_id = ? ORDER BY created_at ASC");
        push_pagination(&mut sql, limit, offset);

        let rows = sqlx::query(&sql)
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows_to_messages(&rows)
    }

    async fn get_message(
        &self,
        chat_id: &Uuid,
        message_id: &Uuid,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ? AND chat_id = ?")
            .bind(message_id.to_string())
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let msg_row = MessageRow::from_row(&row).map_err(query_error)?;
                Ok(Some(msg_row.into_message()?))
            }
            None => Ok(None),
        }
    }

    async fn latest_assistant_since(
        &self,
        chat_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM messages
               WHERE chat_id = ? AND role = 'assistant' AND created_at >= ?
               ORDER BY created_at DESC LIMIT 1"#,
        )
        .bind(chat_id.to_string())
        .bind(format_datetime(&since))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => {
                let msg_row = MessageRow::from_row(&row).map_err(query_error)?;
                Ok(Some(msg_row.into_message()?))
            }
            None => Ok(None),
        }
    }

    async fn delete_all(&self, chat_id: &Uuid) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_error)?;
        delete_messages(&mut conn, chat_id).await
    }
}
