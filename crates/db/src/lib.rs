//! Persistence for invocation records.
//!
//! Repositories issue runtime-checked sqlx queries against Postgres. The
//! [`store`] module wraps them behind the traits the request handlers and
//! the reconciler depend on; [`memory`] provides an in-process
//! implementation of the same traits.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub type DbPool = sqlx::PgPool;

/// Errors surfaced by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Any failure reported by the database driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An insert collided with an existing `invocation_id`.
    #[error("Invocation {0} already exists")]
    Duplicate(String),
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
