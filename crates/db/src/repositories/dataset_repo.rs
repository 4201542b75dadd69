//! Read-only repository for the `datasets` table.

use sqlx::PgPool;

use crate::models::dataset::Dataset;

const COLUMNS: &str = "id, title, bucket_path, created_at";

pub struct DatasetRepo;

impl DatasetRepo {
    /// Find a dataset by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets WHERE id = $1");
        sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
