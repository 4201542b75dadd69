//! Invocation status reconciler.
//!
//! Each tick reads every non-terminal record, asks the workflow service for
//! its current status concurrently, and writes back only real changes. A
//! failure for one record is logged and skipped; the record is retried on
//! the next tick with no backoff state.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use trees_db::models::invocation::{Invocation, StatusUpdate};
use trees_db::store::InvocationStore;
use trees_db::StoreError;
use trees_galaxy::{StatusReport, WorkflowService};

use crate::config::SyncConfig;

/// Counters for one reconciliation tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Non-terminal records examined.
    pub total_checked: usize,
    /// Records whose state changed.
    pub state_updated: usize,
    /// Records whose step summary changed.
    pub summary_updated: usize,
    /// Records with nothing to write.
    pub unchanged: usize,
    /// Records skipped because the status query or the write failed.
    pub errors: usize,
}

/// Result of reconciling a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Unchanged,
    Updated {
        state_changed: bool,
        summary_changed: bool,
    },
    Failed,
}

impl SyncStats {
    fn record(&mut self, outcome: RecordOutcome) {
        self.total_checked += 1;
        match outcome {
            RecordOutcome::Unchanged => self.unchanged += 1,
            RecordOutcome::Updated {
                state_changed,
                summary_changed,
            } => {
                self.state_updated += usize::from(state_changed);
                self.summary_updated += usize::from(summary_changed);
            }
            RecordOutcome::Failed => self.errors += 1,
        }
    }

    /// Whether the tick wrote anything or hit any error.
    pub fn is_quiet(&self) -> bool {
        self.state_updated == 0 && self.summary_updated == 0 && self.errors == 0
    }
}

/// Compare a stored record with a fresh report.
///
/// Returns the update to write, or `None` when state and summary are both
/// unchanged.
pub fn plan_update(stored: &Invocation, report: StatusReport) -> Option<StatusUpdate> {
    if stored.state == report.state && stored.step_summary == report.step_summary {
        return None;
    }
    Some(StatusUpdate {
        state: report.state,
        step_summary: report.step_summary,
    })
}

/// Keeps stored invocation state in step with the workflow service.
pub struct Reconciler {
    store: Arc<dyn InvocationStore>,
    service: Arc<dyn WorkflowService>,
    config: SyncConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn InvocationStore>,
        service: Arc<dyn WorkflowService>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            service,
            config,
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// Run the reconciliation loop until the cancellation token is triggered.
    ///
    /// Ticks run inline, so one loop never overlaps itself; a tick that
    /// overruns the interval delays the next one instead of stacking up.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            record_timeout_secs = self.config.record_timeout.as_secs(),
            "Status reconciler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Status reconciler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sync_once().await {
                        tracing::error!(error = %e, "Reconciliation tick failed");
                    }
                }
            }
        }
    }

    /// One reconciliation tick over every non-terminal record.
    ///
    /// Fails only if the unfinished records cannot be read; per-record
    /// failures are counted in [`SyncStats::errors`].
    pub async fn sync_once(&self) -> Result<SyncStats, StoreError> {
        let unfinished = self.store.list_unfinished().await?;
        if unfinished.is_empty() {
            tracing::debug!("No unfinished invocations to reconcile");
            return Ok(SyncStats::default());
        }

        tracing::debug!(count = unfinished.len(), "Reconciling unfinished invocations");
        let outcomes = join_all(unfinished.iter().map(|inv| self.reconcile_one(inv))).await;

        let mut stats = SyncStats::default();
        for outcome in outcomes {
            stats.record(outcome);
        }

        if stats.is_quiet() {
            tracing::debug!(checked = stats.total_checked, "Reconciliation tick: no changes");
        } else {
            tracing::info!(
                checked = stats.total_checked,
                state_updated = stats.state_updated,
                summary_updated = stats.summary_updated,
                unchanged = stats.unchanged,
                errors = stats.errors,
                "Reconciliation tick completed",
            );
        }
        Ok(stats)
    }

    async fn reconcile_one(&self, stored: &Invocation) -> RecordOutcome {
        let invocation_id = stored.invocation_id.as_str();

        let query = self.service.get_status(invocation_id);
        let report = match tokio::time::timeout(self.config.record_timeout, query).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                tracing::warn!(
                    invocation_id,
                    error = %e,
                    "Status query failed, retrying next tick",
                );
                return RecordOutcome::Failed;
            }
            Err(_) => {
                tracing::warn!(
                    invocation_id,
                    timeout_secs = self.config.record_timeout.as_secs_f64(),
                    "Status query timed out, retrying next tick",
                );
                return RecordOutcome::Failed;
            }
        };

        let state_changed = stored.state != report.state;
        let summary_changed = stored.step_summary != report.step_summary;
        let Some(update) = plan_update(stored, report) else {
            return RecordOutcome::Unchanged;
        };
        if !update.state.is_recognized() {
            tracing::warn!(
                invocation_id,
                state = %update.state,
                "Workflow service reported an unrecognized state; storing as-is",
            );
        }

        match self.store.apply_status(invocation_id, &update).await {
            Ok(true) => {
                if state_changed {
                    tracing::info!(
                        invocation_id,
                        from = %stored.state,
                        to = %update.state,
                        "Invocation state updated",
                    );
                } else {
                    tracing::debug!(invocation_id, "Invocation step summary updated");
                }
                RecordOutcome::Updated {
                    state_changed,
                    summary_changed,
                }
            }
            // Another tick got there first or the row is already terminal.
            Ok(false) => RecordOutcome::Unchanged,
            Err(e) => {
                tracing::error!(invocation_id, error = %e, "Failed to store invocation status");
                RecordOutcome::Failed
            }
        }
    }
}
