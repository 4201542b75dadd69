//! Repository for the `invocations` table.
//!
//! Terminal states come from `trees_core::state::TERMINAL_STATES`; the
//! status update refuses to touch a row that already holds one of them.

use sqlx::PgPool;
use trees_core::state::TERMINAL_STATES;

use crate::models::invocation::{Invocation, InvocationListQuery, NewInvocation, StatusUpdate};

/// Column list for `invocations` queries.
const COLUMNS: &str = "\
    invocation_id, dataset_id, workflow_name, state, step_summary, \
    parameters, overwrite, created_at, updated_at, finished_at";

/// Provides create/read/update operations for invocation records.
pub struct InvocationRepo;

impl InvocationRepo {
    /// Insert a record for an invocation the external service accepted.
    pub async fn insert(pool: &PgPool, input: &NewInvocation) -> Result<Invocation, sqlx::Error> {
        let query = format!(
            "INSERT INTO invocations \
                 (invocation_id, dataset_id, workflow_name, state, parameters, overwrite) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invocation>(&query)
            .bind(&input.invocation_id)
            .bind(&input.dataset_id)
            .bind(&input.workflow_name)
            .bind(input.state.as_str())
            .bind(&input.parameters)
            .bind(input.overwrite)
            .fetch_one(pool)
            .await
    }

    /// Find an invocation by its external identifier.
    pub async fn find_by_id(
        pool: &PgPool,
        invocation_id: &str,
    ) -> Result<Option<Invocation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invocations WHERE invocation_id = $1");
        sqlx::query_as::<_, Invocation>(&query)
            .bind(invocation_id)
            .fetch_optional(pool)
            .await
    }

    /// List invocations, newest first, optionally for a single dataset.
    ///
    /// Ties on `created_at` are broken by `invocation_id` so a page is
    /// stable for a given snapshot.
    pub async fn list(
        pool: &PgPool,
        params: &InvocationListQuery,
    ) -> Result<Vec<Invocation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invocations \
             WHERE ($1::TEXT IS NULL OR dataset_id = $1) \
             ORDER BY created_at DESC, invocation_id ASC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Invocation>(&query)
            .bind(params.dataset_id.as_deref())
            .bind(params.clamped_limit())
            .bind(params.clamped_offset())
            .fetch_all(pool)
            .await
    }

    /// All records whose state is not terminal, oldest first.
    pub async fn list_unfinished(pool: &PgPool) -> Result<Vec<Invocation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM invocations \
             WHERE {} \
             ORDER BY created_at ASC, invocation_id ASC",
            unfinished_predicate()
        );
        sqlx::query_as::<_, Invocation>(&query)
            .fetch_all(pool)
            .await
    }

    /// Write an observed state/summary and bump `updated_at`.
    ///
    /// The row is left untouched when nothing differs or when its stored
    /// state is already terminal. `finished_at` is stamped the first time
    /// a terminal state is written. Returns `true` if a row changed.
    pub async fn apply_status(
        pool: &PgPool,
        invocation_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invocations \
             SET state = $2::TEXT, \
                 step_summary = $3::JSONB, \
                 updated_at = GREATEST(NOW(), updated_at), \
                 finished_at = CASE \
                     WHEN $2::TEXT = ANY($4) THEN COALESCE(finished_at, NOW()) \
                     ELSE finished_at \
                 END \
             WHERE invocation_id = $1 \
               AND state <> ALL($4) \
               AND (state IS DISTINCT FROM $2::TEXT \
                    OR step_summary IS DISTINCT FROM $3::JSONB)",
        )
        .bind(invocation_id)
        .bind(update.state.as_str())
        .bind(&update.step_summary)
        .bind(&TERMINAL_STATES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `state NOT IN ('completed', 'failed')` with literal values. Must match the
/// predicate of `idx_invocations_unfinished` for the partial index to apply.
fn unfinished_predicate() -> String {
    let quoted: Vec<String> = TERMINAL_STATES.iter().map(|s| format!("'{s}'")).collect();
    format!("state NOT IN ({})", quoted.join(", "))
}
