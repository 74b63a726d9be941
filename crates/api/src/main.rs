use api::{build_app, init_database, init_services, AppServices};
use config::{ApiConfig, LoggingConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Load configuration first to get logging settings. A config file takes
    // precedence; environment variables cover containerized deployments.
    let config = match ApiConfig::load() {
        Ok(config) => config,
        Err(config::ConfigError::FileNotFound { .. }) => {
            ApiConfig::from_env().unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {}", e);
                eprintln!("Provide a config.yaml or set the DATABASE_* environment variables.");
                std::process::exit(1);
            })
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            eprintln!("Application cannot start without a valid configuration.");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);

    let database = init_database(&config.database).await;
    let app_services = init_services(database, &config);

    start_maintenance_task(app_services.clone());

    let app = build_app(app_services);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();

    tracing::info!(address = %bind_address, "Server started successfully");
    tracing::info!("Invitation Endpoints:");
    tracing::info!("  - GET/POST /v1/organizations/:org_id/invitations");
    tracing::info!("  - POST /v1/organizations/:org_id/invitations/bulk");
    tracing::info!("  - POST /v1/organizations/:org_id/invitations/:id/resend");
    tracing::info!("  - GET /v1/invitations/:token (public)");
    tracing::info!("  - POST /v1/invitations/:token/accept (public)");
    tracing::info!("Documentation:");
    tracing::info!("  - GET /docs (Swagger UI)");
    tracing::info!("  - GET /api-docs/openapi.json (OpenAPI spec)");

    axum::serve(listener, app).await.unwrap();
}

/// Hourly sweep that finalizes overdue invitations and drops expired
/// sessions and state tokens.
fn start_maintenance_task(app_services: AppServices) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;

            match app_services.invitation_service.mark_expired().await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(count = count, "Marked overdue invitations as expired")
                }
                Err(e) => tracing::error!(error = %e, "Invitation expiry sweep failed"),
            }

            match app_services.sessions.cleanup_expired().await {
                Ok(count) => tracing::debug!(count = count, "Cleaned up expired sessions"),
                Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
            }

            match app_services.state_store.cleanup_expired().await {
                Ok(count) => tracing::debug!(count = count, "Cleaned up expired state tokens"),
                Err(e) => tracing::error!(error = %e, "State token cleanup failed"),
            }
        }
    });
}

fn init_tracing(logging_config: &LoggingConfig) {
    // Build the filter string from the logging configuration
    let mut filter = logging_config.level.clone();

    for (module, level) in &logging_config.modules {
        filter.push_str(&format!(",{}={}", module, level));
    }

    // Initialize tracing based on the format specified in config
    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
