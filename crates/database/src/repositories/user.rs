use crate::models::User as UserRow;
use crate::pool::DbPool;
use crate::repositories::utils::map_db_error;
use crate::retry_db;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use services::auth::{NewUser, User, UserId, UserRepository};
use services::common::RepositoryError;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_user(&self, row: tokio_postgres::Row) -> User {
        let db_user = UserRow {
            id: row.get("id"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            password_hash: row.get("password_hash"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        };

        User {
            id: UserId(db_user.id),
            email: db_user.email,
            first_name: db_user.first_name,
            last_name: db_user.last_name,
            is_active: db_user.is_active,
            created_at: db_user.created_at,
            updated_at: db_user.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn upsert_by_email(&self, user: NewUser) -> Result<User, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        // The no-op DO UPDATE makes the conflict arm return the existing row
        // without touching its name or credential.
        let row = retry_db!("upsert_user_by_email", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_one(
                    "INSERT INTO users (id, email, first_name, last_name, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $5)
                     ON CONFLICT (email) DO UPDATE SET updated_at = users.updated_at
                     RETURNING *",
                    &[&id, &user.email, &user.first_name, &user.last_name, &now],
                )
                .await
                .map_err(map_db_error)
        })?;

        let user = self.row_to_user(row);
        debug!("Upserted user: {} ({})", user.email, user.id);
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = retry_db!("get_user_by_id", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .query_opt("SELECT * FROM users WHERE id = $1", &[&id.0])
                .await
                .map_err(map_db_error)
        })?;

        Ok(row.map(|r| self.row_to_user(r)))
    }

    async fn set_password_hash_if_unset(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let rows_affected = retry_db!("set_user_password_hash_if_unset", {
            let client = self
                .pool
                .get()
                .await
                .context("Failed to get database connection")
                .map_err(RepositoryError::PoolError)?;

            client
                .execute(
                    "UPDATE users
                     SET password_hash = $2, updated_at = NOW()
                     WHERE id = $1 AND password_hash IS NULL",
                    &[&id.0, &password_hash],
                )
                .await
                .map_err(map_db_error)
        })?;

        Ok(rows_affected > 0)
    }
}
