//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at the root.
///
/// ```text
/// GET    /jobs                    -> list_jobs
/// POST   /jobs                    -> create_job
/// GET    /jobs/{invocation_id}    -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/jobs/{invocation_id}", get(jobs::get_job))
}
