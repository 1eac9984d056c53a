//! Structured log sink for job events.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every received [`JobEvent`] as one tracing record. It runs as a
//! long-lived background task and exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{JobEvent, JobEventKind};

/// Background service that logs job events.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<JobEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &JobEvent) {
        match &event.kind {
            JobEventKind::Stage { stage, index } => tracing::debug!(
                job_id = %event.job_id,
                correlation_id = %event.correlation_id,
                stage = stage.as_str(),
                index = ?index,
                "Job progress",
            ),
            JobEventKind::Completed { result } => tracing::info!(
                job_id = %event.job_id,
                correlation_id = %event.correlation_id,
                images = result.images.len(),
                "Job completed",
            ),
            JobEventKind::Failed { error } => tracing::warn!(
                job_id = %event.job_id,
                correlation_id = %event.correlation_id,
                error = %error,
                "Job failed",
            ),
        }
    }
}
