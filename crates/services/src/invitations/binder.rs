use std::sync::Arc;

use crate::auth::{CredentialStore, NewUser, User, UserRepository};
use crate::common::RepositoryError;
use crate::roles::{NewRoleBinding, RoleRepository};

use super::ports::{Invitation, InvitationError};

/// Turns an accepted invitation into an account and a role binding.
///
/// Every step is idempotent: the user upsert reuses an existing account, the
/// credential store keeps an existing password, and the binding upsert treats
/// an already-bound triple as success. A crash between steps therefore leaves
/// nothing that a retry cannot absorb.
pub struct AcceptanceBinder {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    credentials: Arc<dyn CredentialStore>,
}

impl AcceptanceBinder {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            users,
            roles,
            credentials,
        }
    }

    pub async fn bind(
        &self,
        invitation: &Invitation,
        name: &str,
        password: &str,
    ) -> Result<User, InvitationError> {
        let (first_name, last_name) = split_name(name);

        let user = self
            .users
            .upsert_by_email(NewUser {
                email: invitation.email.clone(),
                first_name: Some(first_name),
                last_name,
            })
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to create or look up user: {}", e))
            })?;

        self.credentials
            .hash_and_store(user.id.clone(), password)
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to store credentials: {}", e))
            })?;

        self.roles
            .upsert_binding(NewRoleBinding {
                user_id: user.id.clone(),
                role_id: invitation.role_id.clone(),
                organization_id: invitation.organization_id,
                granted_by_user_id: Some(invitation.invited_by_user_id.clone()),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::ForeignKeyViolation(_) => InvitationError::ValidationError(
                    format!("Role {} no longer exists", invitation.role_id),
                ),
                other => {
                    InvitationError::InternalError(format!("Failed to bind role: {}", other))
                }
            })?;

        Ok(user)
    }
}

/// Split a display name on the first space: "Ada Lovelace King" becomes
/// ("Ada", Some("Lovelace King")); a name without spaces has no last name.
pub(crate) fn split_name(name: &str) -> (String, Option<String>) {
    let trimmed = name.trim();
    match trimmed.split_once(' ') {
        Some((first, rest)) => (first.to_string(), Some(rest.trim().to_string())),
        None => (trimmed.to_string(), None),
    }
}
