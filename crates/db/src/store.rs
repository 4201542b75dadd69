//! Store and catalog seams used by the request handlers and the reconciler.
//!
//! Both are object-safe so callers hold them as `Arc<dyn ...>`. [`PgStore`]
//! implements them on top of the repositories.

use async_trait::async_trait;

use crate::models::dataset::Dataset;
use crate::models::invocation::{Invocation, InvocationListQuery, NewInvocation, StatusUpdate};
use crate::repositories::{DatasetRepo, InvocationRepo};
use crate::{DbPool, StoreError};

/// Persistent invocation records keyed by `invocation_id`.
#[async_trait]
pub trait InvocationStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Duplicate`] if the id exists.
    async fn insert(&self, input: &NewInvocation) -> Result<Invocation, StoreError>;

    async fn find(&self, invocation_id: &str) -> Result<Option<Invocation>, StoreError>;

    async fn list(&self, query: &InvocationListQuery) -> Result<Vec<Invocation>, StoreError>;

    /// Records whose state is outside the terminal set.
    async fn list_unfinished(&self) -> Result<Vec<Invocation>, StoreError>;

    /// Write an observed change. Returns `false` when the row was already
    /// identical or already terminal.
    async fn apply_status(
        &self,
        invocation_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, StoreError>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// The externally owned dataset catalog.
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    /// Look up a dataset. `None` means the dataset does not exist.
    async fn find(&self, dataset_id: &str) -> Result<Option<Dataset>, StoreError>;
}

/// Postgres-backed implementation of both seams.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// PostgreSQL unique violation.
const UNIQUE_VIOLATION: &str = "23505";

#[async_trait]
impl InvocationStore for PgStore {
    async fn insert(&self, input: &NewInvocation) -> Result<Invocation, StoreError> {
        InvocationRepo::insert(&self.pool, input)
            .await
            .map_err(|err| {
                let duplicate = matches!(
                    &err,
                    sqlx::Error::Database(db_err)
                        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                );
                if duplicate {
                    StoreError::Duplicate(input.invocation_id.clone())
                } else {
                    StoreError::Database(err)
                }
            })
    }

    async fn find(&self, invocation_id: &str) -> Result<Option<Invocation>, StoreError> {
        Ok(InvocationRepo::find_by_id(&self.pool, invocation_id).await?)
    }

    async fn list(&self, query: &InvocationListQuery) -> Result<Vec<Invocation>, StoreError> {
        Ok(InvocationRepo::list(&self.pool, query).await?)
    }

    async fn list_unfinished(&self) -> Result<Vec<Invocation>, StoreError> {
        Ok(InvocationRepo::list_unfinished(&self.pool).await?)
    }

    async fn apply_status(
        &self,
        invocation_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, StoreError> {
        Ok(InvocationRepo::apply_status(&self.pool, invocation_id, update).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl DatasetCatalog for PgStore {
    async fn find(&self, dataset_id: &str) -> Result<Option<Dataset>, StoreError> {
        Ok(DatasetRepo::find_by_id(&self.pool, dataset_id).await?)
    }
}
