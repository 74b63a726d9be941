use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

use crate::auth::UserId;
use crate::common::{OrganizationId, RepositoryError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoleId(pub Uuid);

impl From<Uuid> for RoleId {
    fn from(uuid: Uuid) -> Self {
        RoleId(uuid)
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Organization-scoped role. Roles are rows, not a closed enum: each
/// organization defines its own set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub can_manage_invitations: bool,
    pub created_at: DateTime<Utc>,
}

/// Membership record: a user holding a role within an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleBinding {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub organization_id: OrganizationId,
    pub granted_by_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRoleBinding {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub organization_id: OrganizationId,
    pub granted_by_user_id: Option<UserId>,
}

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn get_by_id(
        &self,
        organization_id: OrganizationId,
        role_id: RoleId,
    ) -> Result<Option<Role>, RepositoryError>;

    /// Whether the user holds any role in the organization whose
    /// `can_manage_invitations` flag is set.
    async fn user_can_manage_invitations(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError>;

    /// Create the binding, or return the existing one when the
    /// (user, role, organization) triple is already bound.
    async fn upsert_binding(
        &self,
        binding: NewRoleBinding,
    ) -> Result<RoleBinding, RepositoryError>;
}
