//! Invocation record models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trees_core::state::InvocationState;
use trees_core::types::{DatasetId, InvocationId, Timestamp};

/// Maximum page size for invocation listing.
pub const MAX_LIMIT: i64 = 500;

/// Default page size for invocation listing.
pub const DEFAULT_LIMIT: i64 = 100;

/// A row from the `invocations` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Invocation {
    pub invocation_id: InvocationId,
    pub dataset_id: DatasetId,
    pub workflow_name: String,
    #[sqlx(try_from = "String")]
    pub state: InvocationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_summary: Option<serde_json::Value>,
    pub parameters: serde_json::Value,
    pub overwrite: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// Everything needed to insert a freshly invoked record.
#[derive(Debug, Clone)]
pub struct NewInvocation {
    pub invocation_id: InvocationId,
    pub dataset_id: DatasetId,
    pub workflow_name: String,
    pub state: InvocationState,
    pub parameters: serde_json::Value,
    pub overwrite: bool,
}

/// A state/summary change observed by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub state: InvocationState,
    pub step_summary: Option<serde_json::Value>,
}

/// Query parameters for `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationListQuery {
    /// Only return invocations for this dataset.
    pub dataset_id: Option<DatasetId>,
    /// Maximum number of results. Defaults to 100, capped at 500.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl InvocationListQuery {
    pub fn for_dataset(dataset_id: impl Into<DatasetId>) -> Self {
        Self {
            dataset_id: Some(dataset_id.into()),
            ..Self::default()
        }
    }

    pub fn clamped_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn clamped_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
