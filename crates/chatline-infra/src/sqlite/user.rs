//! SQLite user and API key storage.
//!
//! Credential verification beyond API keys is out of scope; this module only
//! provisions users (regular or guest) and maps a presented API key back to
//! its user.

use chatline_types::error::RepositoryError;
use chatline_types::user::{GUEST_HANDLE_PREFIX, User};
use chrono::{SubsecRound, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};
use crate::crypto::hash::{generate_api_key, hash_api_key};

/// SQLite-backed user store.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a user with a unique email-like handle.
    pub async fn create_user(&self, email: &str) -> Result<User, RepositoryError> {
        let user = User {
            id: Uuid::now_v7(),
            email: email.trim().to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };

        let result = sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(format_datetime(&user.created_at))
            .execute(&self.pool.writer)
            .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("user '{}' already exists", user.email)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    /// Create a guest user with a fresh `guest-<millis>` handle.
    pub async fn create_guest(&self) -> Result<User, RepositoryError> {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            match self.create_user(&format!("{GUEST_HANDLE_PREFIX}{millis}")).await {
                Err(RepositoryError::Conflict(_)) => millis += 1,
                other => return other,
            }
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, created_at FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    /// Issue a new API key for a user. Returns the plaintext key; only its
    /// hash is stored.
    pub async fn issue_api_key(&self, user_id: &Uuid, name: &str) -> Result<String, RepositoryError> {
        let plaintext_key = generate_api_key();

        sqlx::query(
            "INSERT INTO api_keys (id, user_id, key_hash, name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id.to_string())
        .bind(hash_api_key(&plaintext_key))
        .bind(name)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        tracing::info!(user_id = %user_id, key_name = name, "API key issued");
        Ok(plaintext_key)
    }

    /// Resolve an API key to its user.
    pub async fn authenticate(&self, api_key: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT k.id AS key_id, u.id, u.email, u.created_at
               FROM api_keys k JOIN users u ON u.id = k.user_id
               WHERE k.key_hash = ?"#,
        )
        .bind(hash_api_key(api_key))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Update last_used_at (best effort, don't fail the request)
        let key_id: String = row.try_get("key_id").map_err(query_error)?;
        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&key_id)
            .execute(&self.pool.writer)
            .await
        {
            tracing::debug!(error = %e, "Failed to record API key use");
        }

        Ok(Some(row_to_user(&row)?))
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let email: String = row.try_get("email").map_err(query_error)?;
    let created_at: String = row.try_get("created_at").map_err(query_error)?;

    Ok(User {
        id: parse_uuid(&id, "user id")?,
        email,
        created_at: parse_datetime(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::test_pool;
    use chatline_types::user::UserKind;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = repo.create_user("ada@example.com").await.unwrap();
        assert_eq!(user.kind(), UserKind::Regular);

        let found = repo.get_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = SqliteUserRepository::new(test_pool().await);
        repo.create_user("ada@example.com").await.unwrap();
        let err = repo.create_user("ada@example.com").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_guest_users_get_guest_handles() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let a = repo.create_guest().await.unwrap();
        let b = repo.create_guest().await.unwrap();
        assert_eq!(a.kind(), UserKind::Guest);
        assert_eq!(b.kind(), UserKind::Guest);
        assert_ne!(a.email, b.email);
    }

    #[tokio::test]
    async fn test_api_key_authenticates_its_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = repo.create_user("ada@example.com").await.unwrap();
        let key = repo.issue_api_key(&user.id, "default").await.unwrap();

        let authed = repo.authenticate(&key).await.unwrap().unwrap();
        assert_eq!(authed.id, user.id);
        assert!(repo.authenticate("chl_bogus").await.unwrap().is_none());
    }
}
