use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================
// Error envelope
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: None,
                code: None,
            },
        }
    }

    pub fn with_param(message: String, error_type: String, param: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: Some(param),
                code: None,
            },
        }
    }
}

// ============================================
// Invitation API Models
// ============================================

/// Invitation lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl From<services::invitations::InvitationStatus> for InvitationStatus {
    fn from(status: services::invitations::InvitationStatus) -> Self {
        match status {
            services::invitations::InvitationStatus::Pending => InvitationStatus::Pending,
            services::invitations::InvitationStatus::Accepted => InvitationStatus::Accepted,
            services::invitations::InvitationStatus::Expired => InvitationStatus::Expired,
        }
    }
}

/// Request to invite a single member by email
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role_id: Uuid,
}

/// Request to invite several members in one call
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkCreateInvitationsRequest {
    pub invitations: Vec<CreateInvitationRequest>,
}

/// Request to redeem an invitation token and set up the account
#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptInvitationRequest {
    pub name: String,
    pub password: String,
}

/// Invitation as returned by the API. The acceptance token is deliberately
/// absent: it travels only inside the invitation email.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role_id: Uuid,
    pub status: InvitationStatus,
    pub invited_by_user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl From<services::invitations::Invitation> for InvitationResponse {
    fn from(invitation: services::invitations::Invitation) -> Self {
        Self {
            id: invitation.id.0,
            organization_id: invitation.organization_id.0,
            email: invitation.email,
            role_id: invitation.role_id.0,
            status: invitation.status.into(),
            invited_by_user_id: invitation.invited_by_user_id.0,
            accepted_by_user_id: invitation.accepted_by_user_id.map(|u| u.0),
            created_at: invitation.created_at,
            updated_at: invitation.updated_at,
            expires_at: invitation.expires_at,
            accepted_at: invitation.accepted_at,
        }
    }
}

/// Result of a single invitation attempt within a batch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvitationResult {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<InvitationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for batch invitation requests
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkInvitationsResponse {
    pub results: Vec<InvitationResult>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl From<services::invitations::InvitationBatchOutcome> for BulkInvitationsResponse {
    fn from(outcome: services::invitations::InvitationBatchOutcome) -> Self {
        let successful = outcome.created.len();
        let failed = outcome.failed.len();

        let mut results: Vec<InvitationResult> = outcome
            .created
            .into_iter()
            .map(|invitation| InvitationResult {
                email: invitation.email.clone(),
                success: true,
                invitation: Some(invitation.into()),
                error: None,
            })
            .collect();
        results.extend(outcome.failed.into_iter().map(|failure| InvitationResult {
            email: failure.email,
            success: false,
            invitation: None,
            error: Some(failure.error),
        }));

        Self {
            results,
            total: successful + failed,
            successful,
            failed,
        }
    }
}

/// List invitations response with pagination
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListInvitationsResponse {
    pub invitations: Vec<InvitationResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<services::invitations::InvitationPage> for ListInvitationsResponse {
    fn from(page: services::invitations::InvitationPage) -> Self {
        let has_next = page.has_next();
        let has_prev = page.has_prev();
        Self {
            invitations: page.invitations.into_iter().map(Into::into).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
            has_next,
            has_prev,
        }
    }
}

/// User details returned after an invitation is accepted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<services::auth::User> for UserResponse {
    fn from(user: services::auth::User) -> Self {
        let display_name = user.display_name();
        Self {
            id: user.id.0,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            display_name,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Accept invitation response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptInvitationResponse {
    pub invitation: InvitationResponse,
    pub user: UserResponse,
    pub message: String,
}
