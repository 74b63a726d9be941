pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;

use crate::{
    middleware::AuthState,
    openapi::ApiDoc,
    routes::{
        accept::{accept_invitation, get_invitation_by_token},
        api::{build_invitation_management_router, AppState},
        health::health_check,
    },
};
use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use config::ApiConfig;
use database::Database;
use services::{
    auth::{ArgonCredentialStore, AuthService, AuthServiceTrait, CredentialStore},
    email::{EmailSender, LogEmailSender},
    invitations::{InvitationService, InvitationServiceTrait},
    state_store::{MemoryStateStore, StateTokenStore},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Service handles constructed once at startup and shared across the router
/// and background maintenance.
#[derive(Clone)]
pub struct AppServices {
    pub invitation_service: Arc<dyn InvitationServiceTrait>,
    pub auth_service: Arc<dyn AuthServiceTrait>,
    pub sessions: Arc<dyn services::auth::SessionRepository>,
    pub state_store: Arc<dyn StateTokenStore>,
}

/// Initialize database connection and run migrations
pub async fn init_database(db_config: &config::DatabaseConfig) -> Arc<Database> {
    let database = Arc::new(
        Database::from_config(db_config)
            .await
            .expect("Failed to connect to database"),
    );

    tracing::info!("Starting database migrations...");
    database
        .run_migrations()
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations completed.");

    database
}

/// Wire repositories into the service layer
pub fn init_services(database: Arc<Database>, config: &ApiConfig) -> AppServices {
    let user_repository = Arc::new(database::PgUserRepository::new(database.pool().clone()))
        as Arc<dyn services::auth::UserRepository>;
    let session_repository = Arc::new(database::PgSessionRepository::new(database.pool().clone()))
        as Arc<dyn services::auth::SessionRepository>;
    let role_repository = Arc::new(database::PgRoleRepository::new(database.pool().clone()))
        as Arc<dyn services::roles::RoleRepository>;
    let invitation_repository = Arc::new(database::PgInvitationRepository::new(
        database.pool().clone(),
    )) as Arc<dyn services::invitations::InvitationRepository>;

    let auth_service = Arc::new(AuthService::new(
        session_repository.clone(),
        user_repository.clone(),
    )) as Arc<dyn AuthServiceTrait>;

    let credential_store = Arc::new(ArgonCredentialStore::new(user_repository.clone()))
        as Arc<dyn CredentialStore>;
    let email_sender =
        Arc::new(LogEmailSender::new(config.email.clone())) as Arc<dyn EmailSender>;

    let invitation_service = Arc::new(InvitationService::new(
        invitation_repository,
        role_repository,
        user_repository,
        credential_store,
        email_sender,
    )) as Arc<dyn InvitationServiceTrait>;

    let state_store = Arc::new(MemoryStateStore::new()) as Arc<dyn StateTokenStore>;

    AppServices {
        invitation_service,
        auth_service,
        sessions: session_repository,
        state_store,
    }
}

/// Build the complete application router
pub fn build_app(app_services: AppServices) -> Router {
    let auth_state = AuthState::new(app_services.auth_service.clone());
    let app_state = AppState {
        invitation_service: app_services.invitation_service.clone(),
    };

    let management_routes = build_invitation_management_router(app_state.clone(), auth_state);
    let public_routes = build_public_invitation_routes(app_state);
    let openapi_routes = build_openapi_routes();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(
            "/v1",
            Router::new()
                .route("/health", get(health_check))
                .merge(management_routes)
                .merge(public_routes),
        )
        .merge(openapi_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the public invitation routes. Possession of the invitation token is
/// the credential here, so no session middleware is attached.
pub fn build_public_invitation_routes(app_state: AppState) -> Router {
    Router::new().nest(
        "/invitations",
        Router::new()
            .route("/{token}", get(get_invitation_by_token))
            .route("/{token}/accept", post(accept_invitation))
            .with_state(app_state),
    )
}

/// Build OpenAPI documentation routes
pub fn build_openapi_routes() -> Router {
    Router::new().route("/docs", get(swagger_ui_handler)).route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}

/// Serve Swagger UI HTML page
async fn swagger_ui_handler() -> Html<String> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Crewbase API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui.css" />
    <style>
        html {
            box-sizing: border-box;
            overflow: -moz-scrollbars-vertical;
            overflow-y: scroll;
        }
        *, *:before, *:after {
            box-sizing: inherit;
        }
        body {
            margin:0;
            background: #fafafa;
        }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-standalone-preset.js"></script>
    <script>
    window.onload = function() {
        // Dynamically determine the server URL based on current location
        const protocol = window.location.protocol;
        const host = window.location.host;
        const baseUrl = `${protocol}//${host}`;

        fetch('/api-docs/openapi.json')
            .then(response => response.json())
            .then(spec => {
                spec.servers = [{
                    url: baseUrl,
                    description: 'Current Server'
                }];

                SwaggerUIBundle({
                    spec: spec,
                    dom_id: '#swagger-ui',
                    deepLinking: true,
                    presets: [
                        SwaggerUIBundle.presets.apis,
                        SwaggerUIStandalonePreset
                    ],
                    plugins: [
                        SwaggerUIBundle.plugins.DownloadUrl
                    ],
                    layout: "StandaloneLayout",
                    persistAuthorization: true,
                    docExpansion: 'list'
                });
            })
            .catch(error => {
                console.error('Failed to load OpenAPI spec:', error);
            });
    };
    </script>
</body>
</html>"#
            .to_string(),
    )
}
