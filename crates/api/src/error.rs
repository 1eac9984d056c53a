use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prodshot_core::error::CoreError;
use prodshot_core::storage::StorageError;
use prodshot_core::types::JobId;
use prodshot_pipeline::BridgeError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `prodshot_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A file storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The job ran and ended in the failed state.
    #[error("Generation failed: {message}")]
    GenerationFailed { job_id: JobId, message: String },

    /// The job did not finish in time. It keeps running.
    #[error("Timed out waiting for job {job_id}")]
    Timeout { job_id: JobId },

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout { job_id } => AppError::Timeout { job_id },
            BridgeError::JobFailed { job_id, message } => {
                AppError::GenerationFailed { job_id, message }
            }
            BridgeError::NotFound { job_id } => AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            }),
            BridgeError::Store(e) => AppError::Database(e),
        }
    }
}

/// Malformed or mistyped JSON bodies get the same envelope as other client
/// errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

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
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Storage errors ---
            AppError::Storage(err) => match err {
                StorageError::InvalidFilename(name) => (
                    StatusCode::BAD_REQUEST,
                    "BAD_REQUEST",
                    format!("Invalid filename '{name}'"),
                ),
                StorageError::NotFound(name) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("File {name} not found"),
                ),
                StorageError::Io { .. } => {
                    tracing::error!(error = %err, "Storage error");
                    internal()
                }
            },

            // --- Pipeline outcomes ---
            AppError::GenerationFailed { job_id, message } => {
                tracing::warn!(%job_id, error = %message, "Generation failed");
                let body = json!({
                    "success": false,
                    "images": [],
                    "error": message,
                    "code": "GENERATION_FAILED",
                    "jobId": job_id,
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
            }
            AppError::Timeout { job_id } => {
                let body = json!({
                    "success": false,
                    "images": [],
                    "error": "Generation is taking longer than expected. The job is still running.",
                    "code": "GENERATION_TIMEOUT",
                    "jobId": job_id,
                });
                return (StatusCode::GATEWAY_TIMEOUT, axum::Json(body)).into_response();
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
