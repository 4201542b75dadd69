use std::sync::Arc;

use trees_db::store::{DatasetCatalog, InvocationStore};
use trees_galaxy::WorkflowService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Invocation records.
    pub store: Arc<dyn InvocationStore>,
    /// Externally owned dataset catalog.
    pub catalog: Arc<dyn DatasetCatalog>,
    /// External workflow service.
    pub workflows: Arc<dyn WorkflowService>,
    pub config: Arc<ServerConfig>,
}
