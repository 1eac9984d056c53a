//! Handlers for the `/jobs` resource.
//!
//! Asynchronous counterpart of `/generate`: submit returns immediately and
//! the caller polls the job.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use prodshot_core::error::CoreError;
use prodshot_core::job::JobResult;
use prodshot_core::request::{GenerateImageRequest, GenerationRequest};
use prodshot_core::types::{JobId, Timestamp};
use prodshot_db::models::job::{Job, JobCounts};
use prodshot_db::models::status::JobStatus;
use prodshot_db::repositories::JobRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::correlation_id;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for `GET /jobs`.
const DEFAULT_LIST_LIMIT: i64 = 20;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A job as exposed over the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: JobId,
    pub correlation_id: String,
    pub status: &'static str,
    pub request: GenerationRequest,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub attempts: i64,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status().map(JobStatus::as_str).unwrap_or("unknown"),
            correlation_id: job.correlation_id,
            request: job.request.0,
            result: job.result.map(|json| json.0),
            error: job.error_message,
            attempts: job.attempts,
            submitted_at: job.submitted_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Validate and enqueue without waiting. Returns 202 with the waiting job.
pub async fn submit_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let request = input.validate()?;
    let job = state.queue.enqueue(request, correlation_id(&headers)).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: JobSummary::from(job),
        }),
    ))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> AppResult<Json<DataResponse<JobSummary>>> {
    let job = state
        .queue
        .find(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: id.to_string(),
        }))?;

    Ok(Json(DataResponse { data: job.into() }))
}

/// GET /api/v1/jobs?status=&limit=
///
/// Most recent jobs first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<Json<DataResponse<Vec<JobSummary>>>> {
    let status = params
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let jobs = JobRepo::list_recent(&state.pool, status, limit).await?;
    Ok(Json(DataResponse {
        data: jobs.into_iter().map(JobSummary::from).collect(),
    }))
}

/// GET /api/v1/jobs/stats
///
/// Number of jobs per status.
pub async fn job_stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<JobCounts>>> {
    let counts = JobRepo::count_by_status(&state.pool).await?;
    Ok(Json(DataResponse { data: counts }))
}

fn parse_status(label: &str) -> AppResult<JobStatus> {
    JobStatus::ALL
        .iter()
        .copied()
        .find(|s| s.as_str().eq_ignore_ascii_case(label.trim()))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid status '{label}'. Must be one of: waiting, active, completed, failed"
            ))
        })
}
