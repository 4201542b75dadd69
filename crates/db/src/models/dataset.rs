//! Read-only view of the dataset catalog.

use serde::Serialize;
use sqlx::FromRow;
use trees_core::types::{DatasetId, Timestamp};

/// A row from the `datasets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub title: Option<String>,
    /// Object-storage key of the point cloud, relative to the bucket.
    pub bucket_path: String,
    pub created_at: Timestamp,
}
