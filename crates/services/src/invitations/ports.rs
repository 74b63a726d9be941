use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

use crate::auth::{User, UserId};
use crate::common::{OrganizationId, RepositoryError};
use crate::roles::RoleId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct InvitationId(pub Uuid);

impl From<Uuid> for InvitationId {
    fn from(uuid: Uuid) -> Self {
        InvitationId(uuid)
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states. `pending` is the only state a token can be redeemed
/// from; `accepted` and `expired` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(format!("Unknown invitation status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub organization_id: OrganizationId,
    pub email: String,
    pub role_id: RoleId,
    /// Acceptance capability. Leaves the system only inside the invitation
    /// email; list projections must strip it.
    pub token: String,
    pub status: InvitationStatus,
    pub invited_by_user_id: UserId,
    pub accepted_by_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// One requested invitation, as submitted by the caller.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub role_id: RoleId,
}

/// Fully prepared row for persistence: token and expiry already decided.
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub organization_id: OrganizationId,
    pub email: String,
    pub role_id: RoleId,
    pub token: String,
    pub invited_by_user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AcceptInvitation {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedInvitation {
    pub email: String,
    pub error: String,
}

/// Batch outcome. `created.len() + failed.len()` always equals the number of
/// submitted items.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationBatchOutcome {
    pub created: Vec<Invitation>,
    pub failed: Vec<FailedInvitation>,
}

#[derive(Debug, Clone)]
pub struct InvitationPage {
    pub invitations: Vec<Invitation>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl InvitationPage {
    pub fn has_next(&self) -> bool {
        self.offset + self.limit < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error("Invitation not found")]
    InvalidInvitation,

    #[error("Invitation has expired")]
    Expired,

    #[error("Invitation has already been accepted")]
    AlreadyAccepted,

    #[error("Invitation is {0}, only pending invitations can be resent")]
    CannotResend(InvitationStatus),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

// Repository trait
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn create(&self, invitation: CreateInvitation) -> Result<Invitation, RepositoryError>;

    async fn get_by_id(
        &self,
        organization_id: OrganizationId,
        id: InvitationId,
    ) -> Result<Option<Invitation>, RepositoryError>;

    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, RepositoryError>;

    async fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invitation>, RepositoryError>;

    async fn count_by_organization(
        &self,
        organization_id: OrganizationId,
        status: Option<InvitationStatus>,
    ) -> Result<i64, RepositoryError>;

    /// Case-insensitive lookup of a live pending invitation for the address.
    async fn find_pending_by_email(
        &self,
        organization_id: OrganizationId,
        email: &str,
    ) -> Result<Option<Invitation>, RepositoryError>;

    /// Swap in a fresh token and expiry, guarded on the row still being
    /// pending. `None` means the guard failed.
    async fn refresh_token(
        &self,
        organization_id: OrganizationId,
        id: InvitationId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Invitation>, RepositoryError>;

    /// Transition pending -> accepted, recording who redeemed it. `None`
    /// means the row was not pending anymore; exactly one concurrent caller
    /// can win this update.
    async fn accept_if_pending(
        &self,
        id: InvitationId,
        accepted_by: UserId,
    ) -> Result<Option<Invitation>, RepositoryError>;

    /// Transition pending -> expired when the deadline has passed. `None`
    /// means the row was not pending or not yet due.
    async fn expire_if_due(&self, id: InvitationId) -> Result<Option<Invitation>, RepositoryError>;

    /// Sweep every overdue pending invitation to expired.
    async fn mark_expired(&self) -> Result<usize, RepositoryError>;
}

// Service interface
#[async_trait]
pub trait InvitationServiceTrait: Send + Sync {
    async fn create_invitation(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        invitation: NewInvitation,
    ) -> Result<Invitation, InvitationError>;

    async fn create_invitations(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        invitations: Vec<NewInvitation>,
    ) -> Result<InvitationBatchOutcome, InvitationError>;

    async fn resend_invitation(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        id: InvitationId,
    ) -> Result<Invitation, InvitationError>;

    async fn get_invitation_by_token(&self, token: &str) -> Result<Invitation, InvitationError>;

    async fn accept_invitation(
        &self,
        token: &str,
        acceptance: AcceptInvitation,
    ) -> Result<(Invitation, User), InvitationError>;

    async fn list_invitations(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<InvitationPage, InvitationError>;

    async fn mark_expired(&self) -> Result<usize, InvitationError>;
}
