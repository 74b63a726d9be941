pub mod binder;
pub mod ports;
pub mod quota;
pub mod token;

pub use binder::AcceptanceBinder;
pub use ports::*;
pub use quota::{QuotaGuard, MAX_PENDING_INVITATIONS};
pub use token::TokenIssuer;


use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{CredentialStore, User, UserId, UserRepository};
use crate::common::{OrganizationId, RepositoryError};
use crate::email::{EmailSender, InvitationEmail};
use crate::roles::{RoleId, RoleRepository};

/// Invitations stay redeemable for 7 days from creation or resend.
pub const INVITATION_EXPIRY_HOURS: i64 = 168;

/// Hard cap on one bulk request.
pub const MAX_INVITATIONS_PER_BATCH: usize = 100;

pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_NAME_LENGTH: usize = 255;

/// Password policy floor checked at acceptance.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Minimal structural email check: one '@', non-empty local part, domain with
/// an interior dot, no whitespace.
pub fn is_well_formed_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub struct InvitationService {
    invitations: Arc<dyn InvitationRepository>,
    roles: Arc<dyn RoleRepository>,
    token_issuer: TokenIssuer,
    quota: QuotaGuard,
    binder: AcceptanceBinder,
    email: Arc<dyn EmailSender>,
}

impl InvitationService {
    pub fn new(
        invitations: Arc<dyn InvitationRepository>,
        roles: Arc<dyn RoleRepository>,
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialStore>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            quota: QuotaGuard::new(invitations.clone()),
            binder: AcceptanceBinder::new(users, roles.clone(), credentials),
            token_issuer: TokenIssuer::new(),
            invitations,
            roles,
            email,
        }
    }

    async fn ensure_can_manage(
        &self,
        organization_id: OrganizationId,
        requester: &UserId,
    ) -> Result<(), InvitationError> {
        let allowed = self
            .roles
            .user_can_manage_invitations(organization_id, requester.clone())
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to check permissions: {}", e))
            })?;

        if !allowed {
            return Err(InvitationError::Unauthorized(
                "Only members with invitation management permission can manage invitations"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn validate_email(email: &str) -> Result<(), InvitationError> {
        if email.is_empty() {
            return Err(InvitationError::ValidationError(
                "email cannot be empty".to_string(),
            ));
        }
        if email.len() > MAX_EMAIL_LENGTH {
            return Err(InvitationError::ValidationError(format!(
                "email cannot exceed {} characters",
                MAX_EMAIL_LENGTH
            )));
        }
        if !is_well_formed_email(email) {
            return Err(InvitationError::ValidationError(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        Ok(())
    }

    fn validate_acceptance(acceptance: &AcceptInvitation) -> Result<(), InvitationError> {
        let name = acceptance.name.trim();
        if name.is_empty() {
            return Err(InvitationError::ValidationError(
                "name cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(InvitationError::ValidationError(format!(
                "name cannot exceed {} characters",
                MAX_NAME_LENGTH
            )));
        }
        if acceptance.password.len() < PASSWORD_MIN_LENGTH {
            return Err(InvitationError::ValidationError(format!(
                "password must be at least {} characters",
                PASSWORD_MIN_LENGTH
            )));
        }
        let has_letter = acceptance.password.chars().any(|c| c.is_alphabetic());
        let has_digit = acceptance.password.chars().any(|c| c.is_numeric());
        if !has_letter || !has_digit {
            return Err(InvitationError::ValidationError(
                "password must contain at least one letter and one digit".to_string(),
            ));
        }
        Ok(())
    }

    /// Shared create path. Quota is skipped for batch items because the batch
    /// was admitted wholesale up front.
    async fn create_one(
        &self,
        organization_id: OrganizationId,
        requester: &UserId,
        invitation: NewInvitation,
        enforce_quota: bool,
    ) -> Result<Invitation, InvitationError> {
        let email = invitation.email.trim().to_string();
        Self::validate_email(&email)?;

        let role = self
            .roles
            .get_by_id(organization_id, invitation.role_id.clone())
            .await
            .map_err(|e| InvitationError::InternalError(format!("Failed to look up role: {}", e)))?;
        if role.is_none() {
            return Err(InvitationError::ValidationError(format!(
                "Role {} does not exist in this organization",
                invitation.role_id
            )));
        }

        let existing = self
            .invitations
            .find_pending_by_email(organization_id, &email)
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!(
                    "Failed to check for existing invitation: {}",
                    e
                ))
            })?;
        if existing.is_some() {
            return Err(InvitationError::Conflict(format!(
                "A pending invitation already exists for {}",
                email
            )));
        }

        if enforce_quota {
            self.quota.check_capacity(organization_id, 1).await?;
        }

        let created = self
            .persist_with_fresh_token(organization_id, &email, invitation.role_id, requester)
            .await?;

        self.dispatch_email(&created);
        info!(
            invitation_id = %created.id,
            organization_id = %organization_id,
            "Created invitation"
        );
        Ok(created)
    }

    /// The token column is unique; a collision surfaces as `AlreadyExists`
    /// and is retried once with a new token. A second `AlreadyExists` can
    /// only be a concurrent duplicate for the same address.
    async fn persist_with_fresh_token(
        &self,
        organization_id: OrganizationId,
        email: &str,
        role_id: RoleId,
        requester: &UserId,
    ) -> Result<Invitation, InvitationError> {
        for attempt in 0..2 {
            let record = CreateInvitation {
                organization_id,
                email: email.to_string(),
                role_id: role_id.clone(),
                token: self.token_issuer.issue(),
                invited_by_user_id: requester.clone(),
                expires_at: Utc::now() + Duration::hours(INVITATION_EXPIRY_HOURS),
            };

            match self.invitations.create(record).await {
                Ok(invitation) => return Ok(invitation),
                Err(RepositoryError::AlreadyExists) if attempt == 0 => {
                    warn!(
                        organization_id = %organization_id,
                        "Invitation insert hit a unique index, retrying with a fresh token"
                    );
                }
                Err(RepositoryError::AlreadyExists) => {
                    return Err(InvitationError::Conflict(format!(
                        "A pending invitation already exists for {}",
                        email
                    )));
                }
                Err(RepositoryError::ForeignKeyViolation(msg)) => {
                    return Err(InvitationError::ValidationError(format!(
                        "Referenced entity does not exist: {}",
                        msg
                    )));
                }
                Err(e) => {
                    return Err(InvitationError::InternalError(format!(
                        "Failed to create invitation: {}",
                        e
                    )));
                }
            }
        }

        Err(InvitationError::InternalError(
            "Failed to create invitation after token retry".to_string(),
        ))
    }

    /// Delivery never blocks or fails the write path.
    fn dispatch_email(&self, invitation: &Invitation) {
        let sender = self.email.clone();
        let message = InvitationEmail {
            invitation_id: invitation.id.clone(),
            organization_id: invitation.organization_id,
            recipient: invitation.email.clone(),
            token: invitation.token.clone(),
            expires_at: invitation.expires_at,
        };
        tokio::spawn(async move {
            if let Err(e) = sender.send_invitation(message).await {
                warn!(error = %e, "Invitation email dispatch failed");
            }
        });
    }

    /// Token resolution shared by the public inspect and accept paths. Walks
    /// the gates in order: unknown token, already accepted, expired (persisting
    /// the transition lazily when the deadline passed unnoticed).
    async fn resolve_live_by_token(&self, token: &str) -> Result<Invitation, InvitationError> {
        let invitation = self
            .invitations
            .get_by_token(token)
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to look up invitation: {}", e))
            })?
            .ok_or(InvitationError::InvalidInvitation)?;

        match invitation.status {
            InvitationStatus::Accepted => Err(InvitationError::AlreadyAccepted),
            InvitationStatus::Expired => Err(InvitationError::Expired),
            InvitationStatus::Pending if invitation.is_expired_at(Utc::now()) => {
                let expired = self
                    .invitations
                    .expire_if_due(invitation.id.clone())
                    .await
                    .map_err(|e| {
                        InvitationError::InternalError(format!(
                            "Failed to expire invitation: {}",
                            e
                        ))
                    })?;

                if expired.is_none() {
                    // Lost a race; report the terminal state the winner left.
                    let current = self
                        .invitations
                        .get_by_token(token)
                        .await
                        .map_err(|e| {
                            InvitationError::InternalError(format!(
                                "Failed to look up invitation: {}",
                                e
                            ))
                        })?
                        .ok_or(InvitationError::InvalidInvitation)?;
                    if current.status == InvitationStatus::Accepted {
                        return Err(InvitationError::AlreadyAccepted);
                    }
                }
                Err(InvitationError::Expired)
            }
            InvitationStatus::Pending => Ok(invitation),
        }
    }
}

#[async_trait]
impl InvitationServiceTrait for InvitationService {
    async fn create_invitation(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        invitation: NewInvitation,
    ) -> Result<Invitation, InvitationError> {
        self.ensure_can_manage(organization_id, &requester).await?;
        self.create_one(organization_id, &requester, invitation, true)
            .await
    }

    async fn create_invitations(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        invitations: Vec<NewInvitation>,
    ) -> Result<InvitationBatchOutcome, InvitationError> {
        self.ensure_can_manage(organization_id, &requester).await?;

        if invitations.is_empty() {
            return Err(InvitationError::ValidationError(
                "invitations cannot be empty".to_string(),
            ));
        }
        if invitations.len() > MAX_INVITATIONS_PER_BATCH {
            return Err(InvitationError::ValidationError(format!(
                "Maximum {} invitations per request",
                MAX_INVITATIONS_PER_BATCH
            )));
        }

        // The whole batch is admitted or rejected against the quota in one
        // check; per-item failures below never abort the rest.
        self.quota
            .check_capacity(organization_id, invitations.len() as i64)
            .await?;

        let mut outcome = InvitationBatchOutcome {
            created: Vec::new(),
            failed: Vec::new(),
        };

        for invitation in invitations {
            let email = invitation.email.clone();
            match self
                .create_one(organization_id, &requester, invitation, false)
                .await
            {
                Ok(created) => outcome.created.push(created),
                Err(e) => outcome.failed.push(FailedInvitation {
                    email,
                    error: e.to_string(),
                }),
            }
        }

        info!(
            organization_id = %organization_id,
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "Processed invitation batch"
        );
        Ok(outcome)
    }

    async fn resend_invitation(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        id: InvitationId,
    ) -> Result<Invitation, InvitationError> {
        self.ensure_can_manage(organization_id, &requester).await?;

        let invitation = self
            .invitations
            .get_by_id(organization_id, id.clone())
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to look up invitation: {}", e))
            })?
            .ok_or(InvitationError::InvalidInvitation)?;

        if invitation.status != InvitationStatus::Pending {
            return Err(InvitationError::CannotResend(invitation.status));
        }

        // Guarded on the row still being pending, so a concurrently accepted
        // invitation cannot be revived. The old token dies the moment this
        // update commits.
        let refreshed = self
            .invitations
            .refresh_token(
                organization_id,
                id.clone(),
                &self.token_issuer.issue(),
                Utc::now() + Duration::hours(INVITATION_EXPIRY_HOURS),
            )
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to refresh invitation: {}", e))
            })?;

        let Some(refreshed) = refreshed else {
            let current = self
                .invitations
                .get_by_id(organization_id, id)
                .await
                .map_err(|e| {
                    InvitationError::InternalError(format!("Failed to look up invitation: {}", e))
                })?
                .ok_or(InvitationError::InvalidInvitation)?;
            return Err(InvitationError::CannotResend(current.status));
        };

        self.dispatch_email(&refreshed);
        info!(
            invitation_id = %refreshed.id,
            organization_id = %organization_id,
            "Resent invitation"
        );
        Ok(refreshed)
    }

    async fn get_invitation_by_token(&self, token: &str) -> Result<Invitation, InvitationError> {
        self.resolve_live_by_token(token).await
    }

    async fn accept_invitation(
        &self,
        token: &str,
        acceptance: AcceptInvitation,
    ) -> Result<(Invitation, User), InvitationError> {
        let invitation = self.resolve_live_by_token(token).await?;
        Self::validate_acceptance(&acceptance)?;

        // Account, credential and role binding land before the status flips;
        // each is idempotent, so losing the race below leaves nothing broken.
        let user = self
            .binder
            .bind(&invitation, acceptance.name.trim(), &acceptance.password)
            .await?;

        let accepted = self
            .invitations
            .accept_if_pending(invitation.id.clone(), user.id.clone())
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to accept invitation: {}", e))
            })?;

        let Some(accepted) = accepted else {
            // Another acceptance or the expiry sweep won; report what it left.
            let current = self
                .invitations
                .get_by_token(token)
                .await
                .map_err(|e| {
                    InvitationError::InternalError(format!(
                        "Failed to look up invitation: {}",
                        e
                    ))
                })?
                .ok_or(InvitationError::InvalidInvitation)?;
            return match current.status {
                InvitationStatus::Accepted => Err(InvitationError::AlreadyAccepted),
                _ => Err(InvitationError::Expired),
            };
        };

        info!(
            invitation_id = %accepted.id,
            organization_id = %accepted.organization_id,
            user_id = %user.id,
            "Invitation accepted"
        );
        Ok((accepted, user))
    }

    async fn list_invitations(
        &self,
        organization_id: OrganizationId,
        requester: UserId,
        status: Option<InvitationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<InvitationPage, InvitationError> {
        self.ensure_can_manage(organization_id, &requester).await?;

        if limit <= 0 {
            return Err(InvitationError::ValidationError(
                "Limit must be positive".to_string(),
            ));
        }
        if offset < 0 {
            return Err(InvitationError::ValidationError(
                "Offset must be non-negative".to_string(),
            ));
        }

        let invitations = self
            .invitations
            .list_by_organization(organization_id, status, limit, offset)
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to list invitations: {}", e))
            })?;

        let total = self
            .invitations
            .count_by_organization(organization_id, status)
            .await
            .map_err(|e| {
                InvitationError::InternalError(format!("Failed to count invitations: {}", e))
            })?;

        Ok(InvitationPage {
            invitations,
            total,
            limit,
            offset,
        })
    }

    async fn mark_expired(&self) -> Result<usize, InvitationError> {
        let expired = self.invitations.mark_expired().await.map_err(|e| {
            InvitationError::InternalError(format!("Failed to expire invitations: {}", e))
        })?;

        if expired > 0 {
            info!(expired, "Expired overdue invitations");
        }
        Ok(expired)
    }
}
