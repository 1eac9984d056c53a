//! Job entity models.

use prodshot_core::job::JobResult;
use prodshot_core::request::GenerationRequest;
use prodshot_core::types::{JobId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    /// Global FIFO position.
    pub seq: i64,
    pub id: JobId,
    /// Caller-supplied id tying the job to the request that submitted it.
    pub correlation_id: String,
    /// Random id shared by every image filename of this job.
    pub batch_id: String,
    pub status_id: StatusId,
    pub request: Json<GenerationRequest>,
    pub result: Option<Json<JobResult>>,
    pub error_message: Option<String>,
    /// Number of times a worker has claimed this job.
    pub attempts: i64,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Decoded status. Unknown ids (a newer schema) read as `None`.
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_id(self.status_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(JobStatus::is_terminal)
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request.0
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref().map(|json| &json.0)
    }
}

/// Input for [`JobRepo::enqueue`](crate::repositories::JobRepo::enqueue).
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: JobId,
    pub correlation_id: String,
    pub batch_id: String,
    pub request: GenerationRequest,
}

impl NewJob {
    /// New job with a fresh time-ordered id and batch id.
    pub fn new(correlation_id: impl Into<String>, request: GenerationRequest) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            correlation_id: correlation_id.into(),
            batch_id: prodshot_core::naming::new_batch_id(),
            request,
        }
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobCounts {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
}
