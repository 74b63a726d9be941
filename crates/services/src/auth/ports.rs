use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

use crate::common::RepositoryError;

// Domain ID types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionToken(pub String);

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        UserId(uuid)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        SessionId(uuid)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Domain models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Human-readable name for responses and logs; falls back to the email
    /// when no name parts are stored.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Session backing a bearer token. Only the token digest is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Session not found or expired")]
    SessionInvalid,

    #[error("User account is inactive")]
    UserInactive,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

// Repository traits
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create the user when the email is unknown, otherwise return the
    /// existing row untouched (names and credentials are never clobbered).
    async fn upsert_by_email(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Persist a password hash only when the user has none yet. Returns
    /// whether the hash was written.
    async fn set_password_hash_if_unset(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError>;
}

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a session and return it together with the raw token. The raw
    /// token is never stored and never retrievable again.
    async fn create(
        &self,
        user_id: UserId,
        expires_in_hours: i64,
    ) -> Result<(Session, String), RepositoryError>;

    /// Look up a live session by raw token; expired sessions are never
    /// returned.
    async fn validate(&self, token: SessionToken) -> Result<Option<Session>, RepositoryError>;

    async fn cleanup_expired(&self) -> Result<usize, RepositoryError>;
}

/// Credential collaborator used during invitation acceptance. Hashing lives
/// behind this seam so the invitation engine never sees a plaintext-to-storage
/// path.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Hash the password and persist it for the user. For an account that
    /// already holds a credential this is a no-op.
    async fn hash_and_store(&self, user_id: UserId, password: &str) -> Result<(), AuthError>;
}

// Service interface
#[async_trait]
pub trait AuthServiceTrait: Send + Sync {
    /// Resolve a bearer token to an active user.
    async fn authenticate_session(&self, token: SessionToken) -> Result<User, AuthError>;
}
