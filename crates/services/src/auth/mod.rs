pub mod ports;

pub use ports::*;

use argon2::password_hash::rand_core::OsRng;
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use async_trait::async_trait;
use std::sync::Arc;

/// Session-token authentication backed by the user and session repositories.
pub struct AuthService {
    sessions: Arc<dyn SessionRepository>,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(sessions: Arc<dyn SessionRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { sessions, users }
    }
}

#[async_trait]
impl AuthServiceTrait for AuthService {
    async fn authenticate_session(&self, token: SessionToken) -> Result<User, AuthError> {
        let session = self
            .sessions
            .validate(token)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to validate session: {e}")))?
            .ok_or(AuthError::SessionInvalid)?;

        let user = self
            .users
            .get_by_id(session.user_id.clone())
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to load session user: {e}")))?
            .ok_or_else(|| {
                AuthError::AuthFailed(format!("User {} for session not found", session.user_id))
            })?;

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        Ok(user)
    }
}

/// Argon2-backed credential store. Writes at most once per user; an existing
/// credential survives repeated invitation acceptances for the same email.
pub struct ArgonCredentialStore {
    users: Arc<dyn UserRepository>,
}

impl ArgonCredentialStore {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(format!("Failed to hash password: {e}")))?;
        Ok(hash.to_string())
    }
}

#[async_trait]
impl CredentialStore for ArgonCredentialStore {
    async fn hash_and_store(&self, user_id: UserId, password: &str) -> Result<(), AuthError> {
        let hash = Self::hash_password(password)?;
        let written = self
            .users
            .set_password_hash_if_unset(user_id.clone(), &hash)
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to store credential: {e}")))?;

        if !written {
            tracing::debug!(user_id = %user_id, "User already holds a credential, keeping it");
        }
        Ok(())
    }
}
