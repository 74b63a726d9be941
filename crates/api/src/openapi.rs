use crate::models::*;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Crewbase API",
        description = "Invitation lifecycle and membership API for the Crewbase platform.\n\n## Authentication\n\nManagement endpoints use `Authorization: Bearer <session token>`. The public invitation endpoints (`GET /invitations/{token}` and `POST /invitations/{token}/accept`) require no session; possession of the invitation token is the credential.\n\nClick the **Authorize** button above to configure authentication.",
        version = "1.0.0",
        contact(
            name = "Crewbase API Team",
            email = "api-support@crewbase.io"
        ),
        license(
            name = "MIT",
        )
    ),
    paths(
        // Health
        crate::routes::health::health_check,
        // Invitation management endpoints
        crate::routes::invitations::create_invitation,
        crate::routes::invitations::bulk_create_invitations,
        crate::routes::invitations::resend_invitation,
        crate::routes::invitations::list_invitations,
        // Public invitation endpoints
        crate::routes::accept::get_invitation_by_token,
        crate::routes::accept::accept_invitation,
    ),
    components(
        schemas(
            ErrorResponse,
            InvitationStatus,
            CreateInvitationRequest, BulkCreateInvitationsRequest,
            InvitationResponse, InvitationResult, BulkInvitationsResponse,
            ListInvitationsResponse,
            AcceptInvitationRequest, AcceptInvitationResponse, UserResponse,
            crate::routes::health::HealthResponse,
        ),
    ),
    modifiers(&SecurityAddon)
    // No servers - let client determine the URL dynamically
)]
pub struct ApiDoc;

/// Security configuration for OpenAPI
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            // Opaque session tokens presented as bearer credentials
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(
                    HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build(),
                ),
            );
        }

        openapi.security = Some(vec![utoipa::openapi::security::SecurityRequirement::new(
            "session_token",
            Vec::<String>::new(),
        )]);
    }
}

// Server URL will be determined dynamically on the client side
