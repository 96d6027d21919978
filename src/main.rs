use std::net::SocketAddr;
use std::sync::Arc;

use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_capture_api::config::{Config, StorageBackend};
use lead_capture_api::db::Database;
use lead_capture_api::handlers::AppState;
use lead_capture_api::notifier::LeadNotifier;
use lead_capture_api::store::{MemoryStore, PgStore, Store};
use lead_capture_api::{api_routes, finish_router};

/// Builds the public and privileged persistence clients.
async fn build_stores(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Arc<dyn Store>)> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            Ok((Arc::clone(&store), store))
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres storage"))?;

            let db = Database::new(database_url, 10).await?;
            tracing::info!("Database connection pool established");

            if config.run_migrations {
                db.migrate().await?;
                tracing::info!("Database migrations applied");
            }

            let store: Arc<dyn Store> = Arc::new(PgStore::new(db.pool.clone()));

            let admin_store: Arc<dyn Store> = match config.admin_database_url.as_deref() {
                Some(admin_url) => {
                    let admin_db = Database::new(admin_url, 5).await?;
                    tracing::info!("Privileged admin connection pool established");
                    Arc::new(PgStore::new(admin_db.pool))
                }
                None => Arc::clone(&store),
            };

            Ok((store, admin_store))
        }
    }
}

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Persistence clients and migrations.
/// - The lead webhook client.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_capture_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    if config.admin_api_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set; admin and dashboard routes are unauthenticated");
    }

    let (store, admin_store) = build_stores(&config).await?;

    let notifier = match config.lead_webhook_url.clone() {
        Some(url) => match LeadNotifier::new(url) {
            Ok(notifier) => {
                tracing::info!("Lead webhook notifier initialized");
                Some(notifier)
            }
            Err(e) => {
                tracing::error!("Failed to initialize lead webhook notifier: {}", e);
                None
            }
        },
        None => None,
    };

    let app_state = Arc::new(AppState::new(config.clone(), store, admin_store, notifier));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Health stays outside the rate limiter
    let api = api_routes(&app_state).layer(GovernorLayer {
        config: governor_conf,
    });
    let app = finish_router(api, app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
