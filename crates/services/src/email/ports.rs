use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

use crate::common::OrganizationId;
use crate::invitations::InvitationId;

/// Everything a delivery backend needs to render and send one invitation
/// email. This struct is the only place an acceptance token crosses module
/// boundaries on purpose.
#[derive(Debug, Clone)]
pub struct InvitationEmail {
    pub invitation_id: InvitationId,
    pub organization_id: OrganizationId,
    pub recipient: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email dispatch failed: {0}")]
    SendFailed(String),
}

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_invitation(&self, email: InvitationEmail) -> Result<(), EmailError>;
}
