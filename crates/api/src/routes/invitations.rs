use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::middleware::AuthenticatedUser;
use crate::models::{
    BulkCreateInvitationsRequest, BulkInvitationsResponse, CreateInvitationRequest, ErrorResponse,
    InvitationResponse, ListInvitationsResponse,
};
use crate::routes::api::AppState;
use services::common::OrganizationId;
use services::invitations::{InvitationError, InvitationId, InvitationStatus, NewInvitation};
use services::roles::RoleId;

/// Map service errors onto the HTTP error envelope. Internal failures are
/// logged and returned without detail.
pub(crate) fn invitation_error_response(
    error: InvitationError,
) -> (StatusCode, Json<ErrorResponse>) {
    match error {
        InvitationError::ValidationError(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(msg, "validation_error".to_string())),
        ),
        InvitationError::Conflict(msg) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(msg, "conflict".to_string())),
        ),
        InvitationError::QuotaExceeded(msg) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(msg, "quota_exceeded".to_string())),
        ),
        InvitationError::InvalidInvitation => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "Invitation not found".to_string(),
                "not_found".to_string(),
            )),
        ),
        InvitationError::Expired => (
            StatusCode::GONE,
            Json(ErrorResponse::new(
                "Invitation has expired".to_string(),
                "expired".to_string(),
            )),
        ),
        InvitationError::AlreadyAccepted => (
            StatusCode::GONE,
            Json(ErrorResponse::new(
                "Invitation has already been accepted".to_string(),
                "already_accepted".to_string(),
            )),
        ),
        err @ InvitationError::CannotResend(_) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(err.to_string(), "conflict".to_string())),
        ),
        InvitationError::Unauthorized(msg) => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(msg, "forbidden".to_string())),
        ),
        InvitationError::InternalError(msg) => {
            error!("Invitation operation failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "Internal server error".to_string(),
                    "internal_server_error".to_string(),
                )),
            )
        }
    }
}

/// Invite a member by email
///
/// Creates a pending invitation for the address and dispatches the invitation
/// email in the background. The returned invitation never includes the
/// acceptance token.
#[utoipa::path(
    post,
    path = "/v1/organizations/{org_id}/invitations",
    tag = "Invitations",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID")
    ),
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created", body = InvitationResponse),
        (status = 400, description = "Invalid email or unknown role", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requester cannot manage invitations", body = ErrorResponse),
        (status = 409, description = "A pending invitation already exists for this email", body = ErrorResponse),
        (status = 429, description = "Pending invitation quota exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn create_invitation(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), (StatusCode, Json<ErrorResponse>)> {
    debug!(
        "Creating invitation for {} in organization {} by user {}",
        request.email, org_id, user.0.id
    );

    let invitation = app_state
        .invitation_service
        .create_invitation(
            OrganizationId(org_id),
            user.0.id,
            NewInvitation {
                email: request.email,
                role_id: RoleId(request.role_id),
            },
        )
        .await
        .map_err(invitation_error_response)?;

    Ok((StatusCode::CREATED, Json(invitation.into())))
}

/// Invite several members in one call
///
/// Submits up to 100 invitations at once. Entries fail or succeed
/// individually; the response reports both sets. Wholesale rejections (empty
/// list, oversized batch, quota exhausted for the whole batch) return an
/// error status instead.
#[utoipa::path(
    post,
    path = "/v1/organizations/{org_id}/invitations/bulk",
    tag = "Invitations",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID")
    ),
    request_body = BulkCreateInvitationsRequest,
    responses(
        (status = 200, description = "Batch outcome (may include partial failures)", body = BulkInvitationsResponse),
        (status = 400, description = "Empty or oversized batch", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requester cannot manage invitations", body = ErrorResponse),
        (status = 429, description = "Batch would exceed the pending invitation quota", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn bulk_create_invitations(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<BulkCreateInvitationsRequest>,
) -> Result<Json<BulkInvitationsResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!(
        "Creating {} invitations in organization {} by user {}",
        request.invitations.len(),
        org_id,
        user.0.id
    );

    let invitations = request
        .invitations
        .into_iter()
        .map(|entry| NewInvitation {
            email: entry.email,
            role_id: RoleId(entry.role_id),
        })
        .collect();

    let outcome = app_state
        .invitation_service
        .create_invitations(OrganizationId(org_id), user.0.id, invitations)
        .await
        .map_err(invitation_error_response)?;

    Ok(Json(outcome.into()))
}

/// Resend a pending invitation
///
/// Rotates the invitation token, extends the expiry window and dispatches a
/// fresh invitation email. The previous token stops working. Only pending
/// invitations can be resent; an overdue pending invitation is revived.
#[utoipa::path(
    post,
    path = "/v1/organizations/{org_id}/invitations/{invitation_id}/resend",
    tag = "Invitations",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID"),
        ("invitation_id" = Uuid, Path, description = "Invitation ID")
    ),
    responses(
        (status = 200, description = "Invitation resent with a fresh token", body = InvitationResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requester cannot manage invitations", body = ErrorResponse),
        (status = 404, description = "Invitation not found in this organization", body = ErrorResponse),
        (status = 409, description = "Invitation is no longer pending", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn resend_invitation(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvitationResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!(
        "Resending invitation {} in organization {} by user {}",
        invitation_id, org_id, user.0.id
    );

    let invitation = app_state
        .invitation_service
        .resend_invitation(
            OrganizationId(org_id),
            user.0.id,
            InvitationId(invitation_id),
        )
        .await
        .map_err(invitation_error_response)?;

    Ok(Json(invitation.into()))
}

/// Query parameters for listing invitations
#[derive(Debug, Deserialize)]
pub struct ListInvitationsParams {
    #[serde(default = "crate::routes::common::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<String>,
}

/// List invitations for an organization
///
/// Returns invitations ordered by creation time, newest first, optionally
/// filtered by status. Acceptance tokens are never included.
#[utoipa::path(
    get,
    path = "/v1/organizations/{org_id}/invitations",
    tag = "Invitations",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID"),
        ("limit" = Option<i64>, Query, description = "Number of records to return (default: 100, max: 1000)"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination (default: 0)"),
        ("status" = Option<String>, Query, description = "Filter by status: pending, accepted or expired")
    ),
    responses(
        (status = 200, description = "Page of invitations", body = ListInvitationsResponse),
        (status = 400, description = "Invalid pagination or status filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - requester cannot manage invitations", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("session_token" = [])
    )
)]
pub async fn list_invitations(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(org_id): Path<Uuid>,
    Query(params): Query<ListInvitationsParams>,
) -> Result<Json<ListInvitationsResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!(
        "Listing invitations for organization {} by user {} (limit: {}, offset: {})",
        org_id, user.0.id, params.limit, params.offset
    );

    crate::routes::common::validate_limit_offset(params.limit, params.offset)?;

    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse::<InvitationStatus>().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_param(
                    format!("Invalid status filter: {}", raw),
                    "invalid_parameter".to_string(),
                    "status".to_string(),
                )),
            )
        })?),
    };

    let page = app_state
        .invitation_service
        .list_invitations(
            OrganizationId(org_id),
            user.0.id,
            status,
            params.limit,
            params.offset,
        )
        .await
        .map_err(invitation_error_response)?;

    Ok(Json(page.into()))
}
