//! In-process implementation of [`InvocationStore`] and [`DatasetCatalog`].
//!
//! Mirrors the Postgres semantics: duplicate ids are rejected, listing is
//! `created_at DESC, invocation_id ASC`, and a status update never touches
//! an identical or already-terminal record. Used by the test suites and for
//! running the service without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::dataset::Dataset;
use crate::models::invocation::{Invocation, InvocationListQuery, NewInvocation, StatusUpdate};
use crate::store::{DatasetCatalog, InvocationStore};
use crate::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    invocations: RwLock<HashMap<String, Invocation>>,
    datasets: RwLock<HashMap<String, Dataset>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset in the catalog.
    pub async fn add_dataset(&self, id: &str, bucket_path: &str) {
        let dataset = Dataset {
            id: id.to_string(),
            title: None,
            bucket_path: bucket_path.to_string(),
            created_at: Utc::now(),
        };
        self.datasets.write().await.insert(id.to_string(), dataset);
    }

    /// Insert a fully formed record, bypassing insert-time defaults.
    pub async fn seed(&self, invocation: Invocation) {
        self.invocations
            .write()
            .await
            .insert(invocation.invocation_id.clone(), invocation);
    }

    /// Snapshot of a single record.
    pub async fn get(&self, invocation_id: &str) -> Option<Invocation> {
        self.invocations.read().await.get(invocation_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.invocations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of successful inserts and status writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent read fail as if the database were down.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail as if the database were down.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn newest_first(a: &Invocation, b: &Invocation) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.invocation_id.cmp(&b.invocation_id))
}

#[async_trait]
impl InvocationStore for MemoryStore {
    async fn insert(&self, input: &NewInvocation) -> Result<Invocation, StoreError> {
        self.check_writes()?;
        let mut rows = self.invocations.write().await;
        if rows.contains_key(&input.invocation_id) {
            return Err(StoreError::Duplicate(input.invocation_id.clone()));
        }
        let now = Utc::now();
        let row = Invocation {
            invocation_id: input.invocation_id.clone(),
            dataset_id: input.dataset_id.clone(),
            workflow_name: input.workflow_name.clone(),
            state: input.state.clone(),
            step_summary: None,
            parameters: input.parameters.clone(),
            overwrite: input.overwrite,
            created_at: now,
            updated_at: now,
            finished_at: None,
        };
        rows.insert(row.invocation_id.clone(), row.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn find(&self, invocation_id: &str) -> Result<Option<Invocation>, StoreError> {
        self.check_reads()?;
        Ok(self.get(invocation_id).await)
    }

    async fn list(&self, query: &InvocationListQuery) -> Result<Vec<Invocation>, StoreError> {
        self.check_reads()?;
        let rows = self.invocations.read().await;
        let mut matching: Vec<Invocation> = rows
            .values()
            .filter(|inv| {
                query
                    .dataset_id
                    .as_deref()
                    .map_or(true, |ds| inv.dataset_id == ds)
            })
            .cloned()
            .collect();
        matching.sort_by(newest_first);

        let offset = usize::try_from(query.clamped_offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.clamped_limit()).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_unfinished(&self) -> Result<Vec<Invocation>, StoreError> {
        self.check_reads()?;
        let rows = self.invocations.read().await;
        let mut unfinished: Vec<Invocation> = rows
            .values()
            .filter(|inv| !inv.state.is_terminal())
            .cloned()
            .collect();
        unfinished.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.invocation_id.cmp(&b.invocation_id))
        });
        Ok(unfinished)
    }

    async fn apply_status(
        &self,
        invocation_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, StoreError> {
        self.check_writes()?;
        let mut rows = self.invocations.write().await;
        let Some(row) = rows.get_mut(invocation_id) else {
            return Ok(false);
        };
        if row.state.is_terminal()
            || (row.state == update.state && row.step_summary == update.step_summary)
        {
            return Ok(false);
        }

        let now = Utc::now().max(row.updated_at);
        row.state = update.state.clone();
        row.step_summary = update.step_summary.clone();
        row.updated_at = now;
        if row.state.is_terminal() && row.finished_at.is_none() {
            row.finished_at = Some(now);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reads()
    }
}

#[async_trait]
impl DatasetCatalog for MemoryStore {
    async fn find(&self, dataset_id: &str) -> Result<Option<Dataset>, StoreError> {
        self.check_reads()?;
        Ok(self.datasets.read().await.get(dataset_id).cloned())
    }
}
