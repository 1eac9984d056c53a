//! Synchronous "submit and wait" over the asynchronous job queue.
//!
//! The caller subscribes to the event bus before enqueueing, so the terminal
//! event for its job cannot be missed. The durable store is consulted on
//! broadcast lag, on bus closure and on a slow reconciliation tick, which
//! also covers a worker running in another process.

use std::sync::Arc;
use std::time::Duration;

use prodshot_core::job::JobResult;
use prodshot_core::request::GenerationRequest;
use prodshot_core::types::JobId;
use prodshot_db::models::job::Job;
use prodshot_db::models::status::JobStatus;
use prodshot_events::{EventBus, JobEvent, JobEventKind};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::MissedTickBehavior;

use crate::queue::JobQueue;

/// Default interval between durable-store checks while waiting.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The job did not finish in time. It keeps running.
    #[error("Timed out waiting for job {job_id}")]
    Timeout { job_id: JobId },

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: JobId, message: String },

    #[error("Job {job_id} not found")]
    NotFound { job_id: JobId },

    #[error("Job store error: {0}")]
    Store(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CompletionBridge {
    queue: JobQueue,
    bus: Arc<EventBus>,
    reconcile_interval: Duration,
}

/// An enqueued job whose terminal event is being listened for.
pub struct Submission {
    job: Job,
    events: Receiver<JobEvent>,
    bridge: CompletionBridge,
}

impl Submission {
    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn job_id(&self) -> JobId {
        self.job.id
    }

    /// Wait up to `timeout` for the job to reach a terminal state.
    pub async fn wait(self, timeout: Duration) -> Result<JobResult, BridgeError> {
        self.bridge
            .await_terminal(self.job.id, Some(self.events), timeout)
            .await
    }
}

impl CompletionBridge {
    pub fn new(queue: JobQueue, bus: Arc<EventBus>) -> Self {
        Self {
            queue,
            bus,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }

    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Enqueue `request`, already subscribed to its events.
    pub async fn submit(
        &self,
        request: GenerationRequest,
        correlation_id: impl Into<String>,
    ) -> Result<Submission, BridgeError> {
        let events = self.bus.subscribe();
        let job = self.queue.enqueue(request, correlation_id).await?;
        Ok(Submission {
            job,
            events,
            bridge: self.clone(),
        })
    }

    /// Enqueue `request` and wait up to `timeout` for its result.
    pub async fn submit_and_wait(
        &self,
        request: GenerationRequest,
        correlation_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<JobResult, BridgeError> {
        self.submit(request, correlation_id).await?.wait(timeout).await
    }

    /// Wait for a job that was submitted earlier, possibly by another process.
    pub async fn wait(&self, job_id: JobId, timeout: Duration) -> Result<JobResult, BridgeError> {
        let events = self.bus.subscribe();
        self.await_terminal(job_id, Some(events), timeout).await
    }

    async fn await_terminal(
        &self,
        job_id: JobId,
        mut events: Option<Receiver<JobEvent>>,
        timeout: Duration,
    ) -> Result<JobResult, BridgeError> {
        let waiting = async {
            // The first tick fires immediately, covering jobs that are
            // already terminal.
            let mut reconcile = tokio::time::interval(self.reconcile_interval);
            reconcile.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    received = next_event(&mut events) => match received {
                        Ok(event) if event.job_id == job_id => {
                            if let Some(outcome) = outcome_of_event(event) {
                                return outcome;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(%job_id, skipped, "Completion wait lagged, checking job store");
                            if let Some(outcome) = self.check_store(job_id).await? {
                                return outcome;
                            }
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!(%job_id, "Event bus closed, relying on job store");
                            events = None;
                            if let Some(outcome) = self.check_store(job_id).await? {
                                return outcome;
                            }
                        }
                    },
                    _ = reconcile.tick() => {
                        if let Some(outcome) = self.check_store(job_id).await? {
                            return outcome;
                        }
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, waiting).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(%job_id, timeout_ms = timeout.as_millis() as u64, "Completion wait timed out");
                Err(BridgeError::Timeout { job_id })
            }
        }
    }

    /// Terminal outcome recorded in the store, if any.
    async fn check_store(
        &self,
        job_id: JobId,
    ) -> Result<Option<Result<JobResult, BridgeError>>, BridgeError> {
        let job = self
            .queue
            .find(job_id)
            .await?
            .ok_or(BridgeError::NotFound { job_id })?;
        Ok(outcome_of_job(&job))
    }
}

async fn next_event(events: &mut Option<Receiver<JobEvent>>) -> Result<JobEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn outcome_of_event(event: JobEvent) -> Option<Result<JobResult, BridgeError>> {
    match event.kind {
        JobEventKind::Completed { result } => Some(Ok(result)),
        JobEventKind::Failed { error } => Some(Err(BridgeError::JobFailed {
            job_id: event.job_id,
            message: error,
        })),
        JobEventKind::Stage { .. } => None,
    }
}

fn outcome_of_job(job: &Job) -> Option<Result<JobResult, BridgeError>> {
    match job.status()? {
        JobStatus::Completed => Some(job.result().cloned().ok_or_else(|| BridgeError::JobFailed {
            job_id: job.id,
            message: "Job completed without a result".to_string(),
        })),
        JobStatus::Failed => Some(Err(BridgeError::JobFailed {
            job_id: job.id,
            message: job
                .error_message
                .clone()
                .unwrap_or_else(|| "Job failed".to_string()),
        })),
        JobStatus::Waiting | JobStatus::Active => None,
    }
}
