use crate::models::Session as SessionRow;
use crate::pool::DbPool;
use crate::repositories::utils::map_db_error;
use crate::retry_db;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use services::auth::{Session, SessionId, SessionRepository, SessionToken, UserId};
use services::common::{generate_session_token, hash_token, RepositoryError};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: DbPool,
}

impl PgSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_session(&self, row: tokio_postgres::Row) -> Session {
        let db_session = SessionRow {
            id: row.get("id"),
            user_id: row.get("user_id"),
            token_hash: row.get("token_hash"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        };

        Session {
            id: SessionId(db_session.id),
            user_id: UserId(db_session.user_id),
            token_hash: db_session.token_hash,
            created_at: db_session.created_at,
            expires_at: db_session.expires_at,
        }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(
        &self,
        user_id: UserId,
        expires_in_hours: i64,
    ) -> Result<(Session, String), RepositoryError> {
        let id = Uuid::new_v4();
        let session_token = generate_session_token();
        let token_hash = hash_token(&session_token);
        let now = Utc::now();
        let expires_at = now + Duration::hours(expires_in_hours);

        let row = retry_db!("create_session", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_one(
                    "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING *",
                    &[&id, &user_id.0, &token_hash, &now, &expires_at],
                )
                .await
                .map_err(map_db_error)
        })?;

        debug!("Created session: {} for user: {}", id, user_id);

        Ok((self.row_to_session(row), session_token))
    }

    async fn validate(&self, token: SessionToken) -> Result<Option<Session>, RepositoryError> {
        let token_hash = hash_token(&token.0);

        let row = retry_db!("validate_session", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt(
                    "SELECT * FROM sessions WHERE token_hash = $1 AND expires_at > NOW()",
                    &[&token_hash],
                )
                .await
                .map_err(map_db_error)
        })?;

        Ok(row.map(|r| self.row_to_session(r)))
    }

    async fn cleanup_expired(&self) -> Result<usize, RepositoryError> {
        let rows_affected = retry_db!("cleanup_expired_sessions", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .execute("DELETE FROM sessions WHERE expires_at < NOW()", &[])
                .await
                .map_err(map_db_error)
        })?;

        debug!("Cleaned up {} expired sessions", rows_affected);
        Ok(rows_affected as usize)
    }
}
