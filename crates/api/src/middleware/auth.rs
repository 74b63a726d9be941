use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use services::auth::{AuthError, AuthServiceTrait, SessionToken, User};
use std::sync::Arc;
use tracing::{debug, error};

/// Authenticated user information passed to route handlers
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub User);

/// State for authentication middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<dyn AuthServiceTrait>,
}

impl AuthState {
    pub fn new(auth_service: Arc<dyn AuthServiceTrait>) -> Self {
        Self { auth_service }
    }
}

/// Session-token authentication middleware. Expects an
/// `Authorization: Bearer <token>` header and attaches the resolved user to
/// the request extensions.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, axum::Json<crate::models::ErrorResponse>)> {
    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let Some(auth_value) = auth_header else {
        debug!("No authorization header found");
        return Err((
            StatusCode::UNAUTHORIZED,
            axum::Json(crate::models::ErrorResponse::new(
                "Missing authorization".to_string(),
                "unauthorized".to_string(),
            )),
        ));
    };

    let Some(token) = auth_value.strip_prefix("Bearer ") else {
        debug!("Authorization header does not start with 'Bearer '");
        return Err((
            StatusCode::UNAUTHORIZED,
            axum::Json(crate::models::ErrorResponse::new(
                "Authorization header does not start with 'Bearer '".to_string(),
                "unauthorized".to_string(),
            )),
        ));
    };

    let user = authenticate_session_token(&state, token).await?;
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

async fn authenticate_session_token(
    state: &AuthState,
    token: &str,
) -> Result<User, (StatusCode, axum::Json<crate::models::ErrorResponse>)> {
    match state
        .auth_service
        .authenticate_session(SessionToken(token.to_string()))
        .await
    {
        Ok(user) => {
            debug!("Authenticated user {} via session", user.email);
            Ok(user)
        }
        Err(AuthError::SessionInvalid) => {
            debug!("Invalid or expired session token");
            Err((
                StatusCode::UNAUTHORIZED,
                axum::Json(crate::models::ErrorResponse::new(
                    "Invalid or expired session token".to_string(),
                    "unauthorized".to_string(),
                )),
            ))
        }
        Err(AuthError::UserInactive) => {
            debug!("Session belongs to an inactive user");
            Err((
                StatusCode::FORBIDDEN,
                axum::Json(crate::models::ErrorResponse::new(
                    "User account is inactive".to_string(),
                    "forbidden".to_string(),
                )),
            ))
        }
        Err(AuthError::AuthFailed(msg)) => {
            error!("Session resolved to an unknown user: {}", msg);
            Err((
                StatusCode::UNAUTHORIZED,
                axum::Json(crate::models::ErrorResponse::new(
                    "Invalid or expired session token".to_string(),
                    "unauthorized".to_string(),
                )),
            ))
        }
        Err(AuthError::InternalError(msg)) => {
            error!("Failed to validate session: {}", msg);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(crate::models::ErrorResponse::new(
                    "Failed to validate session".to_string(),
                    "internal_server_error".to_string(),
                )),
            ))
        }
    }
}
