use crate::middleware::{auth_middleware, AuthState};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use services::invitations::InvitationServiceTrait;
use std::sync::Arc;

use crate::routes::invitations::{
    bulk_create_invitations, create_invitation, list_invitations, resend_invitation,
};

/// Application state shared across invitation route handlers
#[derive(Clone)]
pub struct AppState {
    pub invitation_service: Arc<dyn InvitationServiceTrait>,
}

/// Build the organization-scoped invitation management router. Every route
/// here requires a valid session and invitation management permission (the
/// latter is enforced by the service).
pub fn build_invitation_management_router(app_state: AppState, auth_state: AuthState) -> Router {
    Router::new()
        .route(
            "/organizations/{org_id}/invitations",
            get(list_invitations).post(create_invitation),
        )
        .route(
            "/organizations/{org_id}/invitations/bulk",
            post(bulk_create_invitations),
        )
        .route(
            "/organizations/{org_id}/invitations/{invitation_id}/resend",
            post(resend_invitation),
        )
        .with_state(app_state)
        .layer(from_fn_with_state(auth_state, auth_middleware))
}
