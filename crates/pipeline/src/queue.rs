//! Injectable handle to the durable job queue.

use std::sync::Arc;

use prodshot_core::request::GenerationRequest;
use prodshot_core::types::JobId;
use prodshot_db::models::job::{Job, NewJob};
use prodshot_db::repositories::JobRepo;
use prodshot_db::DbPool;
use tokio::sync::Notify;

/// Producer side of the queue, plus the wake-up signal the in-process
/// worker listens on.
///
/// Cloning is cheap; all clones share the pool and the signal.
#[derive(Clone)]
pub struct JobQueue {
    pool: DbPool,
    wake: Arc<Notify>,
}

impl JobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Persist a waiting job and wake the worker. Never waits for processing.
    pub async fn enqueue(
        &self,
        request: GenerationRequest,
        correlation_id: impl Into<String>,
    ) -> Result<Job, sqlx::Error> {
        let job = JobRepo::enqueue(&self.pool, &NewJob::new(correlation_id, request)).await?;
        tracing::info!(
            job_id = %job.id,
            correlation_id = %job.correlation_id,
            seq = job.seq,
            "Job enqueued",
        );
        self.wake.notify_one();
        Ok(job)
    }

    pub async fn find(&self, job_id: JobId) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::find_by_id(&self.pool, job_id).await
    }

    /// Resolves after the next [`enqueue`](Self::enqueue) on this queue.
    pub async fn woken(&self) {
        self.wake.notified().await;
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
