//! Factura API Server
//!
//! Main entry point for the Factura invoicing backend.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use factura_api::{AppState, create_router};
use factura_core::storage::{StorageConfig, StorageService};
use factura_db::connect_with_pool;
use factura_shared::{AppConfig, EmailService, JwtConfig, JwtService, StorageSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factura=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let email_service = EmailService::new(config.email.clone());
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        email_service: Arc::new(email_service),
        storage: init_storage(&config.storage),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the storage backend. File endpoints answer 503 when this fails.
fn init_storage(settings: &StorageSettings) -> Option<Arc<StorageService>> {
    if settings.kind.eq_ignore_ascii_case("none") {
        info!("File storage disabled");
        return None;
    }

    match StorageConfig::from_settings(settings).and_then(StorageService::from_config) {
        Ok(service) => {
            info!(provider = service.provider_name(), "Storage service configured");
            Some(Arc::new(service))
        }
        Err(e) => {
            warn!(error = %e, "Storage unavailable; receipt and PDF endpoints are disabled");
            None
        }
    }
}
