//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The worker publishes a [`JobEvent`] at every stage of a job and exactly
//! one terminal event (completed or failed). Waiters subscribe before
//! enqueueing so they cannot miss the terminal event of their own job.

use chrono::{DateTime, Utc};
use prodshot_core::job::JobResult;
use prodshot_core::types::JobId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Processing stage of an active job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStage {
    /// A worker took the job off the queue.
    Claimed,
    /// Building the synthesis prompt.
    OptimizingPrompt,
    /// Requesting an image from the synthesis service.
    Generating,
    /// Writing an image to storage.
    Persisting,
    /// Applying the logo or watermark to a stored image.
    Compositing,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::OptimizingPrompt => "optimizing-prompt",
            Self::Generating => "generating",
            Self::Persisting => "persisting",
            Self::Compositing => "compositing",
        }
    }
}

/// What happened to the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    /// Progress within the job. `index` is the image being processed.
    Stage { stage: JobStage, index: Option<u32> },
    Completed { result: JobResult },
    Failed { error: String },
}

/// A lifecycle notification for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub correlation_id: String,
    pub kind: JobEventKind,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    fn new(job_id: JobId, correlation_id: impl Into<String>, kind: JobEventKind) -> Self {
        Self {
            job_id,
            correlation_id: correlation_id.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn stage(
        job_id: JobId,
        correlation_id: impl Into<String>,
        stage: JobStage,
        index: Option<u32>,
    ) -> Self {
        Self::new(job_id, correlation_id, JobEventKind::Stage { stage, index })
    }

    pub fn completed(job_id: JobId, correlation_id: impl Into<String>, result: JobResult) -> Self {
        Self::new(job_id, correlation_id, JobEventKind::Completed { result })
    }

    pub fn failed(job_id: JobId, correlation_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            job_id,
            correlation_id,
            JobEventKind::Failed {
                error: error.into(),
            },
        )
    }

    /// Dot-separated event name, e.g. `"job.completed"`.
    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            JobEventKind::Stage { .. } => "job.progress",
            JobEventKind::Completed { .. } => "job.completed",
            JobEventKind::Failed { .. } => "job.failed",
        }
    }

    /// Completed or failed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, JobEventKind::Stage { .. })
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobEvent`].
///
/// # Usage
///
/// ```rust
/// use prodshot_events::bus::{EventBus, JobEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(JobEvent::failed(uuid::Uuid::nil(), "req-1", "boom"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use prodshot_core::storage::StoredFile;

    fn job_id() -> JobId {
        uuid::Uuid::new_v4()
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let id = job_id();

        bus.publish(JobEvent::stage(id, "req-1", JobStage::Generating, Some(2)));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.job_id, id);
        assert_eq!(received.correlation_id, "req-1");
        assert_eq!(
            received.kind,
            JobEventKind::Stage {
                stage: JobStage::Generating,
                index: Some(2)
            }
        );
        assert!(!received.is_terminal());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(JobEvent::failed(job_id(), "req", "boom"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.event_type(), "job.failed");
        assert_eq!(e1, e2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(JobEvent::failed(job_id(), "orphan", "nobody listening"));
    }

    #[test]
    fn stage_names_are_kebab_case() {
        let json = serde_json::to_value(JobStage::OptimizingPrompt).unwrap();
        assert_eq!(json, JobStage::OptimizingPrompt.as_str());
    }

    #[test]
    fn terminal_events_serialize_with_type_tag() {
        let result = JobResult {
            images: vec![StoredFile {
                url: "/images/a.png".to_string(),
                filename: "a.png".to_string(),
            }],
            prompt: "p".to_string(),
        };
        let event = JobEvent::completed(job_id(), "req", result);
        assert!(event.is_terminal());
        assert_eq!(event.event_type(), "job.completed");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "completed");
        assert_eq!(json["kind"]["result"]["images"][0]["filename"], "a.png");
    }
}
