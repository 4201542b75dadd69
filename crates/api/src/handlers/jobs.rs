//! Handlers for the `/jobs` resource.
//!
//! Creating a job invokes the workflow on the external service first and
//! writes the record only after the invoke succeeds, so a stored record
//! always corresponds to a real external invocation. Both steps run in a
//! spawned task that outlives the request.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use trees_core::error::CoreError;
use trees_core::state::InvocationState;
use trees_core::workflow::{validate_identifier, validate_parameters};
use trees_db::models::invocation::{Invocation, InvocationListQuery, NewInvocation};
use trees_galaxy::InvokeRequest;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub dataset_id: String,
    pub workflow_name: String,
    /// Recorded and forwarded; this service does not act on it.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "empty_parameters")]
    pub parameters: serde_json::Value,
}

fn empty_parameters() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Response of `POST /jobs`.
#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub invocation_id: String,
    pub state: InvocationState,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /jobs
///
/// Validate the request, check the dataset exists, invoke the workflow and
/// persist the returned invocation. Returns 201 with `{invocation_id, state}`.
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let dataset_id = validate_identifier("dataset_id", &input.dataset_id)?;
    let workflow_name = validate_identifier("workflow_name", &input.workflow_name)?;
    validate_parameters(&input.parameters)?;
    state.config.workflow_allowlist.check(&workflow_name)?;

    let dataset = state
        .catalog
        .find(&dataset_id)
        .await?
        .ok_or_else(|| CoreError::Validation(format!("dataset {dataset_id} not found")))?;

    let request = InvokeRequest {
        workflow_name,
        dataset_id,
        dataset_location: dataset.bucket_path,
        parameters: input.parameters,
        overwrite: input.overwrite,
    };

    // Invoke and insert run detached from the request so a timeout or a
    // client disconnect cannot drop the future between the two.
    let task = tokio::spawn(invoke_and_record(state, request));
    let created = task.await.map_err(|e| {
        tracing::error!(error = %e, "Job creation task failed");
        AppError::InternalError(e.to_string())
    })??;

    tracing::info!(
        invocation_id = %created.invocation_id,
        dataset_id = %created.dataset_id,
        workflow_name = %created.workflow_name,
        state = %created.state,
        "Job created",
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            invocation_id: created.invocation_id,
            state: created.state,
        }),
    ))
}

/// Invoke the workflow, then persist the returned invocation.
async fn invoke_and_record(state: AppState, request: InvokeRequest) -> AppResult<Invocation> {
    let invoked = state.workflows.invoke(&request).await?;

    let record = NewInvocation {
        invocation_id: invoked.invocation_id,
        dataset_id: request.dataset_id,
        workflow_name: request.workflow_name,
        state: invoked.state,
        parameters: request.parameters,
        overwrite: request.overwrite,
    };
    let created = state.store.insert(&record).await.inspect_err(|e| {
        // The external run exists but has no record; nothing will track it.
        tracing::error!(
            invocation_id = %record.invocation_id,
            error = %e,
            "Invocation started but could not be recorded",
        );
    })?;
    Ok(created)
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /jobs
///
/// List invocations, newest first. Supports optional `dataset_id`, `limit`
/// and `offset` query parameters.
pub async fn list_jobs(
    State(state): State<AppState>,
    params: Result<Query<InvocationListQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let jobs = state.store.list(&params).await?;
    Ok(Json(jobs))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /jobs/{invocation_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(invocation_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .find(&invocation_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Invocation",
            id: invocation_id,
        }))?;
    Ok(Json(job))
}
