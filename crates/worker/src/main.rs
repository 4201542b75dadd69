//! Standalone status reconciler.
//!
//! Without arguments it runs a single reconciliation tick, prints the
//! tick's stats as JSON and exits, which suits an external scheduler such
//! as cron. With `--watch` it runs the fixed-interval loop until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trees_db::store::PgStore;
use trees_galaxy::{GalaxyClient, GalaxyConfig};
use trees_sync::{Reconciler, SyncConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trees_worker=debug,trees_sync=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let watch = std::env::args().skip(1).any(|arg| arg == "--watch");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = trees_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    trees_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let client = GalaxyClient::new(GalaxyConfig::from_env())
        .context("Failed to build workflow service client")?;

    let reconciler = Reconciler::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(client),
        SyncConfig::from_env(),
    );

    if !watch {
        let stats = reconciler
            .sync_once()
            .await
            .context("Reconciliation tick failed")?;
        println!("{}", serde_json::to_string(&stats)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    reconciler.run(cancel).await;
    tracing::info!("Worker stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping"),
        () = terminate => tracing::info!("Received SIGTERM, stopping"),
    }
}
