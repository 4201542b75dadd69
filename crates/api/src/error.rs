use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use trees_core::error::CoreError;
use trees_db::StoreError;
use trees_galaxy::WorkflowError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, the store and workflow service
/// errors, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent `{"error", "code"}` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `trees_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The invocation store or dataset catalog failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The external workflow service refused or failed the call.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Store errors ---
            AppError::Store(StoreError::Duplicate(id)) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Invocation {id} already exists"),
            ),
            AppError::Store(StoreError::Database(err)) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                )
            }

            // --- Workflow service errors ---
            AppError::Workflow(WorkflowError::UnknownWorkflow(name)) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_WORKFLOW",
                format!("Workflow '{name}' is not available"),
            ),
            AppError::Workflow(err) => {
                tracing::warn!(error = %err, "Workflow service call failed");
                (StatusCode::BAD_GATEWAY, "WORKFLOW_ERROR", err.to_string())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
