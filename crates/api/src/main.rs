use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trees_api::background::status_sync;
use trees_api::config::ServerConfig;
use trees_api::router::build_app_router;
use trees_api::state::AppState;
use trees_db::store::PgStore;
use trees_galaxy::{GalaxyClient, GalaxyConfig};
use trees_sync::SyncConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trees_api=debug,trees_sync=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        allowlist = ?config.workflow_allowlist.names(),
        sync_enabled = config.sync_enabled,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = trees_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    trees_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    trees_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool));

    // --- Workflow service ---
    let galaxy_config = GalaxyConfig::from_env();
    tracing::info!(url = %galaxy_config.url, "Workflow service configured");
    let workflows = Arc::new(
        GalaxyClient::new(galaxy_config).expect("Failed to build workflow service client"),
    );

    // --- Status reconciler ---
    let sync_cancel = CancellationToken::new();
    let sync_handle = if config.sync_enabled {
        Some(status_sync::spawn(
            store.clone(),
            workflows.clone(),
            SyncConfig::from_env(),
            sync_cancel.clone(),
        ))
    } else {
        tracing::info!("Status reconciler disabled (SYNC_ENABLED=false)");
        None
    };

    // --- App state ---
    let state = AppState {
        store: store.clone(),
        catalog: store,
        workflows,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sync_cancel.cancel();
    if let Some(handle) = sync_handle {
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Status reconciler did not stop in time"
            );
        } else {
            tracing::info!("Status reconciler stopped");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
