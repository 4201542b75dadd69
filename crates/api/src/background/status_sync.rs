//! In-process status reconciliation.
//!
//! Runs the [`Reconciler`] loop next to the HTTP server so stored invocation
//! state follows the workflow service without a separate worker process.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trees_db::store::InvocationStore;
use trees_galaxy::WorkflowService;
use trees_sync::{Reconciler, SyncConfig};

/// Spawn the reconciliation loop. It stops when `cancel` is triggered.
pub fn spawn(
    store: Arc<dyn InvocationStore>,
    service: Arc<dyn WorkflowService>,
    config: SyncConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let reconciler = Reconciler::new(store, service, config);
    tokio::spawn(async move { reconciler.run(cancel).await })
}
