//! Repository for the `jobs` table.
//!
//! Every status transition is a single guarded `UPDATE`, so a job only moves
//! forward (waiting -> active -> completed | failed) even when several
//! processes share the database.

use chrono::Utc;
use prodshot_core::job::JobResult;
use prodshot_core::types::{JobId, Timestamp};
use sqlx::types::Json;

use crate::models::job::{Job, JobCounts, NewJob};
use crate::models::status::{JobStatus, StatusId};
use crate::DbPool;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    seq, id, correlation_id, batch_id, status_id, request, result, error_message, \
    attempts, submitted_at, started_at, completed_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Provides queue operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Append a waiting job at the tail of the queue.
    pub async fn enqueue(pool: &DbPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, correlation_id, batch_id, status_id, request, submitted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.id)
            .bind(&input.correlation_id)
            .bind(&input.batch_id)
            .bind(JobStatus::Waiting.id())
            .bind(Json(&input.request))
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest waiting job and mark it active.
    ///
    /// The select and the update run as one statement, so two claimers can
    /// never receive the same job.
    pub async fn claim_next(pool: &DbPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = ?1, started_at = ?2, attempts = attempts + 1 \
             WHERE seq = ( \
                 SELECT seq FROM jobs \
                 WHERE status_id = ?3 \
                 ORDER BY seq ASC \
                 LIMIT 1 \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Active.id())
            .bind(Utc::now())
            .bind(JobStatus::Waiting.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark an active job completed with its result.
    ///
    /// Returns `false` if the job was not active.
    pub async fn complete(
        pool: &DbPool,
        job_id: JobId,
        result: &JobResult,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = ?2, result = ?3, completed_at = ?4 \
             WHERE id = ?1 AND status_id = ?5",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .bind(Json(result))
        .bind(Utc::now())
        .bind(JobStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() == 1)
    }

    /// Mark an active job failed with an error message.
    ///
    /// Returns `false` if the job was not active.
    pub async fn fail(pool: &DbPool, job_id: JobId, message: &str) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = ?2, error_message = ?3, completed_at = ?4 \
             WHERE id = ?1 AND status_id = ?5",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(message)
        .bind(Utc::now())
        .bind(JobStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() == 1)
    }

    /// Find a job by id.
    pub async fn find_by_id(pool: &DbPool, job_id: JobId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = ?1");
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recently submitted jobs first, optionally filtered by status.
    pub async fn list_recent(
        pool: &DbPool,
        status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let limit = limit.clamp(1, MAX_LIMIT);
        match status {
            Some(status) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM jobs WHERE status_id = ?1 ORDER BY seq DESC LIMIT ?2"
                );
                sqlx::query_as::<_, Job>(&query)
                    .bind(status.id())
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!("SELECT {COLUMNS} FROM jobs ORDER BY seq DESC LIMIT ?1");
                sqlx::query_as::<_, Job>(&query)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Count jobs per status.
    pub async fn count_by_status(pool: &DbPool) -> Result<JobCounts, sqlx::Error> {
        let rows: Vec<(StatusId, i64)> =
            sqlx::query_as("SELECT status_id, COUNT(*) FROM jobs GROUP BY status_id")
                .fetch_all(pool)
                .await?;

        let mut counts = JobCounts::default();
        for (status_id, count) in rows {
            match JobStatus::from_id(status_id) {
                Some(JobStatus::Waiting) => counts.waiting = count,
                Some(JobStatus::Active) => counts.active = count,
                Some(JobStatus::Completed) => counts.completed = count,
                Some(JobStatus::Failed) => counts.failed = count,
                None => tracing::warn!(status_id, "Unknown job status in jobs table"),
            }
        }
        Ok(counts)
    }

    /// Fail every job left active by a worker that stopped mid-job.
    ///
    /// Intended to run once at worker start-up, before claiming. Returns the
    /// number of jobs failed.
    pub async fn recover_interrupted(pool: &DbPool, message: &str) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = ?1, error_message = ?2, completed_at = ?3 \
             WHERE status_id = ?4",
        )
        .bind(JobStatus::Failed.id())
        .bind(message)
        .bind(Utc::now())
        .bind(JobStatus::Active.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected())
    }

    /// Delete completed and failed jobs that finished before `cutoff`.
    pub async fn purge_terminal(pool: &DbPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            "DELETE FROM jobs \
             WHERE status_id IN (?1, ?2) AND completed_at IS NOT NULL AND completed_at < ?3",
        )
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::Failed.id())
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected())
    }
}
