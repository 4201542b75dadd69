//! Client for the external workflow service (a Galaxy server).
//!
//! [`WorkflowService`] is the capability the rest of the workspace depends
//! on. [`client::GalaxyClient`] talks to a real Galaxy over HTTP and
//! [`mock::ScriptedWorkflowService`] simulates one in-process.

use async_trait::async_trait;
use trees_core::state::InvocationState;

pub mod client;
pub mod config;
pub mod mock;
pub mod state_map;

pub use client::GalaxyClient;
pub use config::GalaxyConfig;

/// Everything the external service needs to start one workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    pub workflow_name: String,
    pub dataset_id: String,
    /// Storage location of the dataset, as recorded in the catalog.
    pub dataset_location: String,
    /// Passed through untouched; the external service validates them.
    pub parameters: serde_json::Value,
    /// Informational hint, forwarded as-is.
    pub overwrite: bool,
}

/// Identifier and initial state returned by a successful invoke.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoked {
    pub invocation_id: String,
    pub state: InvocationState,
}

/// Current view of one invocation on the external service.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: InvocationState,
    /// Per-step/per-job snapshot, opaque to this system.
    pub step_summary: Option<serde_json::Value>,
}

/// Errors from the workflow service layer.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Workflow service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// No workflow with the requested name is installed.
    #[error("Workflow '{0}' is not available on the workflow service")]
    UnknownWorkflow(String),

    /// A response did not have the expected shape.
    #[error("Unexpected workflow service response: {0}")]
    Decode(String),

    /// Client construction failed (bad URL, unusable API key).
    #[error("Invalid workflow service configuration: {0}")]
    Config(String),
}

/// Capability interface over the external workflow service.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Start a workflow run. Not idempotent: every call starts a new run.
    async fn invoke(&self, request: &InvokeRequest) -> Result<Invoked, WorkflowError>;

    /// Fetch the current state and step summary of an invocation.
    async fn get_status(&self, invocation_id: &str) -> Result<StatusReport, WorkflowError>;
}
