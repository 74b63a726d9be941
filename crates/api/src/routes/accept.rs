use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::models::{
    AcceptInvitationRequest, AcceptInvitationResponse, ErrorResponse, InvitationResponse,
};
use crate::routes::api::AppState;
use crate::routes::invitations::invitation_error_response;
use services::invitations::AcceptInvitation;

/// Get invitation details by token (public endpoint)
///
/// Returns invitation details for a specific token so the invitee can review
/// the invitation before setting up an account. Possession of the token is
/// the only credential; no session is required.
#[utoipa::path(
    get,
    path = "/v1/invitations/{token}",
    tag = "Invitations",
    params(
        ("token" = String, Path, description = "Invitation token")
    ),
    responses(
        (status = 200, description = "Invitation details", body = InvitationResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse),
        (status = 410, description = "Invitation expired or already accepted", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_invitation_by_token(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Getting invitation by token");

    let invitation = app_state
        .invitation_service
        .get_invitation_by_token(&token)
        .await
        .map_err(invitation_error_response)?;

    Ok(Json(invitation.into()))
}

/// Accept an invitation (public endpoint)
///
/// Redeems the invitation token: creates or reuses the user account for the
/// invited email, stores the password for accounts without one, and binds the
/// user to the invitation's role. Accepting the same invitation twice
/// returns 410.
#[utoipa::path(
    post,
    path = "/v1/invitations/{token}/accept",
    tag = "Invitations",
    params(
        ("token" = String, Path, description = "Invitation token")
    ),
    request_body = AcceptInvitationRequest,
    responses(
        (status = 200, description = "Invitation accepted, account bound to the role", body = AcceptInvitationResponse),
        (status = 400, description = "Invalid name or password", body = ErrorResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse),
        (status = 410, description = "Invitation expired or already accepted", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn accept_invitation(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Accepting invitation by token");

    let (invitation, user) = app_state
        .invitation_service
        .accept_invitation(
            &token,
            AcceptInvitation {
                name: request.name,
                password: request.password,
            },
        )
        .await
        .map_err(invitation_error_response)?;

    Ok(Json(AcceptInvitationResponse {
        invitation: invitation.into(),
        user: user.into(),
        message: "Successfully joined organization".to_string(),
    }))
}
