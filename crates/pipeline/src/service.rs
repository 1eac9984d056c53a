//! Pipeline lifecycle: storage setup, worker construction, start and
//! shutdown of the background tasks.

use std::sync::Arc;

use prodshot_compositor::Compositor;
use prodshot_core::storage::{LocalStorage, StorageError};
use prodshot_db::repositories::JobRepo;
use prodshot_events::{EventBus, EventLogger};
use prodshot_synthesis::{SynthesisApi, SynthesisError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bridge::CompletionBridge;
use crate::config::{ConfigError, PipelineConfig, IMAGE_URL_PREFIX, LOGO_URL_PREFIX};
use crate::queue::JobQueue;
use crate::worker::{Worker, WorkerOptions};

/// Error recorded on jobs a crashed worker left active.
pub const INTERRUPTED_MESSAGE: &str = "Job interrupted by a worker restart";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Job store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Synthesis client error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// The two file stores: generated images and uploaded logos.
#[derive(Debug, Clone)]
pub struct Stores {
    pub images: Arc<LocalStorage>,
    pub logos: Arc<LocalStorage>,
}

impl Stores {
    pub async fn open(config: &PipelineConfig) -> Result<Self, StorageError> {
        let images = LocalStorage::open(&config.image_dir, IMAGE_URL_PREFIX).await?;
        let logos = LocalStorage::open(&config.logo_dir, LOGO_URL_PREFIX).await?;
        Ok(Self {
            images: Arc::new(images),
            logos: Arc::new(logos),
        })
    }
}

/// Worker wired to the HTTP synthesis client and local storage.
pub fn build_worker(
    config: &PipelineConfig,
    queue: JobQueue,
    bus: Arc<EventBus>,
    stores: &Stores,
) -> Result<Worker, PipelineError> {
    let synthesizer = SynthesisApi::new(config.synthesis.clone())?;
    tracing::info!(endpoint = synthesizer.endpoint(), "Synthesis client configured");

    let compositor = Compositor::with_font_dir(config.font_dir.as_ref());
    if !compositor.has_fonts() {
        tracing::warn!("No fonts found, text watermarks will fail and images will be kept without them");
    }

    Ok(Worker::new(
        queue,
        bus,
        Arc::new(synthesizer),
        stores.images.clone(),
        stores.logos.clone(),
        compositor,
        WorkerOptions {
            poll_interval: config.poll_interval,
            rate_limit_max_jobs: config.rate_limit_max_jobs,
            rate_limit_window: config.rate_limit_window,
            job_retention: config.job_retention,
            ..WorkerOptions::default()
        },
    ))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Running pipeline: the event logger and, optionally, the worker loop.
pub struct Pipeline {
    queue: JobQueue,
    bus: Arc<EventBus>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    logger: JoinHandle<()>,
}

impl Pipeline {
    /// Spawn the background tasks.
    ///
    /// With a worker, jobs a previous worker left active are failed first so
    /// their waiters resolve. Without one, jobs are processed by a worker in
    /// another process sharing the same store.
    pub async fn start(
        queue: JobQueue,
        bus: Arc<EventBus>,
        worker: Option<Worker>,
    ) -> Result<Self, PipelineError> {
        let cancel = CancellationToken::new();
        let logger = tokio::spawn(EventLogger::run(bus.subscribe()));

        let worker = match worker {
            Some(worker) => {
                let recovered = JobRepo::recover_interrupted(queue.pool(), INTERRUPTED_MESSAGE).await?;
                if recovered > 0 {
                    tracing::warn!(recovered, "Failed jobs interrupted by a previous worker");
                }
                let token = cancel.clone();
                Some(tokio::spawn(async move { worker.run(token).await }))
            }
            None => {
                tracing::info!("No embedded worker, jobs are processed by an external worker");
                None
            }
        };

        Ok(Self {
            queue,
            bus,
            cancel,
            worker,
            logger,
        })
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn bridge(&self) -> CompletionBridge {
        CompletionBridge::new(self.queue.clone(), self.bus.clone())
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the worker after its in-flight job and stop the event logger.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
        self.logger.abort();
        tracing::info!("Pipeline stopped");
    }
}
