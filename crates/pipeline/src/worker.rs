//! The single consumer of the job queue.
//!
//! Wakes on an enqueue notification or a poll tick, claims waiting jobs in
//! FIFO order (delaying, never skipping, when the start rate limit is hit)
//! and runs each job to a terminal state. Stops when the cancellation token
//! is triggered.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use prodshot_compositor::{conform_to_resolution, Compositor, LogoAsset};
use prodshot_core::job::{GeneratedImage, JobResult};
use prodshot_core::logo::{LogoKind, LogoSettings};
use prodshot_core::naming::{extension_for_bytes, generated_image_filename};
use prodshot_core::prompt::build_prompt;
use prodshot_core::storage::{BlobStorage, StorageError};
use prodshot_db::models::job::Job;
use prodshot_db::repositories::JobRepo;
use prodshot_events::{EventBus, JobEvent, JobStage};
use prodshot_synthesis::{ImageSynthesizer, SynthesisRequest};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::queue::JobQueue;
use crate::rate_limit::SlidingWindowLimiter;

/// Default retention sweep interval.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Job store error: {0}")]
    Store(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Fallback poll interval when no enqueue wake-up arrives.
    pub poll_interval: Duration,
    /// Job starts allowed per `rate_limit_window`.
    pub rate_limit_max_jobs: usize,
    pub rate_limit_window: Duration,
    /// Terminal jobs older than this are deleted by the retention sweep.
    pub job_retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            rate_limit_max_jobs: 10,
            rate_limit_window: Duration::from_secs(60),
            job_retention: Duration::from_secs(3600),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

pub struct Worker {
    queue: JobQueue,
    bus: Arc<EventBus>,
    synthesizer: Arc<dyn ImageSynthesizer>,
    images: Arc<dyn BlobStorage>,
    logos: Arc<dyn BlobStorage>,
    compositor: Compositor,
    limiter: Mutex<SlidingWindowLimiter>,
    options: WorkerOptions,
}

/// Why a job ended in the failed state.
type JobFailure = String;

impl Worker {
    pub fn new(
        queue: JobQueue,
        bus: Arc<EventBus>,
        synthesizer: Arc<dyn ImageSynthesizer>,
        images: Arc<dyn BlobStorage>,
        logos: Arc<dyn BlobStorage>,
        compositor: Compositor,
        options: WorkerOptions,
    ) -> Self {
        let limiter = SlidingWindowLimiter::new(options.rate_limit_max_jobs, options.rate_limit_window);
        Self {
            queue,
            bus,
            synthesizer,
            images,
            logos,
            compositor,
            limiter: Mutex::new(limiter),
            options,
        }
    }

    /// Run the worker loop until the cancellation token is triggered.
    ///
    /// An in-flight job is finished before the loop observes cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweeper = tokio::time::interval(self.options.sweep_interval);
        sweeper.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.options.poll_interval.as_millis() as u64,
            rate_limit_max_jobs = self.options.rate_limit_max_jobs,
            rate_limit_window_secs = self.options.rate_limit_window.as_secs(),
            "Worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker shutting down");
                    break;
                }
                _ = self.queue.woken() => self.drain_logged(&cancel).await,
                _ = ticker.tick() => self.drain_logged(&cancel).await,
                _ = sweeper.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }
    }

    async fn drain_logged(&self, cancel: &CancellationToken) {
        if let Err(e) = self.drain(cancel).await {
            tracing::error!(error = %e, "Queue drain failed");
        }
    }

    /// Process waiting jobs until the queue is empty or `cancel` fires.
    ///
    /// Returns the number of jobs run to a terminal state.
    pub async fn drain(&self, cancel: &CancellationToken) -> Result<usize, WorkerError> {
        let mut processed = 0;
        while !cancel.is_cancelled() {
            if !self.wait_for_slot(cancel).await {
                break;
            }
            let Some(job) = JobRepo::claim_next(self.queue.pool()).await? else {
                break;
            };
            self.record_start();
            self.process(job).await;
            processed += 1;
        }
        Ok(processed)
    }

    /// Sleep until the limiter admits another start. `false` if cancelled.
    async fn wait_for_slot(&self, cancel: &CancellationToken) -> bool {
        loop {
            let delay = match self.limiter.lock() {
                Ok(mut limiter) => limiter.delay_at(Instant::now()),
                Err(poisoned) => poisoned.into_inner().delay_at(Instant::now()),
            };
            let Some(delay) = delay else {
                return true;
            };
            tracing::info!(delay_ms = delay.as_millis() as u64, "Rate limit reached, delaying next job");
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn record_start(&self) {
        match self.limiter.lock() {
            Ok(mut limiter) => limiter.record(Instant::now()),
            Err(poisoned) => poisoned.into_inner().record(Instant::now()),
        }
    }

    /// Delete terminal jobs older than the retention period.
    pub async fn sweep(&self) -> Result<u64, WorkerError> {
        let retention = chrono::Duration::from_std(self.options.job_retention)
            .unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(retention)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let purged = JobRepo::purge_terminal(self.queue.pool(), cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, "Purged expired jobs");
        }
        Ok(purged)
    }

    // -----------------------------------------------------------------------
    // Per-job processing
    // -----------------------------------------------------------------------

    /// Run a claimed job and record its terminal state.
    async fn process(&self, job: Job) {
        let started = Instant::now();
        tracing::info!(
            job_id = %job.id,
            correlation_id = %job.correlation_id,
            batch_id = %job.batch_id,
            num_images = job.request().num_images,
            "Job started",
        );
        self.stage(&job, JobStage::Claimed, None);

        match self.execute(&job).await {
            Ok(result) => match JobRepo::complete(self.queue.pool(), job.id, &result).await {
                Ok(true) => {
                    tracing::info!(
                        job_id = %job.id,
                        images = result.images.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Job completed",
                    );
                    self.bus
                        .publish(JobEvent::completed(job.id, job.correlation_id.clone(), result));
                }
                Ok(false) => {
                    tracing::warn!(job_id = %job.id, "Job was no longer active on completion");
                }
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to record job completion");
                    self.record_failure(&job, format!("Job result could not be recorded: {e}"))
                        .await;
                }
            },
            Err(message) => {
                tracing::warn!(
                    job_id = %job.id,
                    error = %message,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job failed",
                );
                self.record_failure(&job, message).await;
            }
        }
    }

    /// Fail the job in the store and publish the failure.
    ///
    /// The event is published even when the store write fails so waiters in
    /// this process still resolve.
    async fn record_failure(&self, job: &Job, message: JobFailure) {
        if let Err(e) = JobRepo::fail(self.queue.pool(), job.id, &message).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to record job failure");
        }
        self.bus
            .publish(JobEvent::failed(job.id, job.correlation_id.clone(), message));
    }

    async fn execute(&self, job: &Job) -> Result<JobResult, JobFailure> {
        let request = job.request();

        self.stage(job, JobStage::OptimizingPrompt, None);
        let prompt = build_prompt(request);
        let (width, height) = request.resolution.dimensions();
        let synthesis = SynthesisRequest::new(
            prompt.prompt.clone(),
            prompt.negative_prompt.clone(),
            (width, height),
        );
        tracing::debug!(job_id = %job.id, prompt = %prompt.prompt, "Prompt built");

        let timestamp_ms = Utc::now().timestamp_millis();
        let mut images = Vec::with_capacity(request.num_images as usize);

        for index in 0..request.num_images {
            self.stage(job, JobStage::Generating, Some(index));
            let bytes = match self.synthesizer.generate(&synthesis).await {
                Ok(bytes) => bytes,
                Err(e) if index == 0 => {
                    return Err(format!("Image generation failed: {e}"));
                }
                Err(e) => {
                    tracing::warn!(job_id = %job.id, index, error = %e, "Image generation failed, skipping");
                    continue;
                }
            };

            self.stage(job, JobStage::Persisting, Some(index));
            match self
                .persist(job, timestamp_ms, index, bytes, (width, height))
                .await
            {
                Ok(file) => {
                    tracing::info!(job_id = %job.id, index, filename = %file.filename, "Image stored");
                    images.push(file);
                }
                Err(e) => {
                    tracing::error!(job_id = %job.id, index, error = %e, "Failed to store image, skipping");
                }
            }
        }

        if images.is_empty() {
            return Err("No images were generated".to_string());
        }

        if let Some(logo) = request.logo.as_ref().filter(|l| l.requires_compositing()) {
            self.composite_all(job, logo, &images).await;
        }

        Ok(JobResult {
            images,
            prompt: prompt.prompt,
        })
    }

    /// Conform to the requested resolution and write under the job's
    /// collision-free filename.
    async fn persist(
        &self,
        job: &Job,
        timestamp_ms: i64,
        index: u32,
        bytes: Vec<u8>,
        (width, height): (u32, u32),
    ) -> Result<GeneratedImage, StorageError> {
        let bytes = match tokio::task::spawn_blocking(move || {
            conform_to_resolution(&bytes, width, height).map_err(|e| (e, bytes))
        })
        .await
        {
            Ok(Ok(conformed)) => conformed,
            Ok(Err((e, original))) => {
                tracing::warn!(job_id = %job.id, index, error = %e, "Could not conform image, storing as received");
                original
            }
            Err(e) => {
                return Err(StorageError::Io {
                    filename: format!("image {index}"),
                    source: std::io::Error::other(e),
                });
            }
        };

        let filename =
            generated_image_filename(timestamp_ms, &job.batch_id, index, extension_for_bytes(&bytes));
        self.images.put(&filename, &bytes).await
    }

    /// Overlay the logo on every stored image. Failures keep the original.
    async fn composite_all(&self, job: &Job, logo: &LogoSettings, images: &[GeneratedImage]) {
        let asset = match self.load_asset(logo).await {
            Ok(asset) => asset.map(Arc::new),
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Logo asset unavailable, images kept without logo");
                return;
            }
        };

        for (index, image) in images.iter().enumerate() {
            self.stage(job, JobStage::Compositing, Some(index as u32));
            if let Err(e) = self.composite_one(logo, asset.clone(), &image.filename).await {
                tracing::warn!(
                    job_id = %job.id,
                    filename = %image.filename,
                    error = %e,
                    "Compositing failed, original image kept",
                );
            }
        }
    }

    async fn load_asset(&self, logo: &LogoSettings) -> Result<Option<LogoAsset>, StorageError> {
        match &logo.kind {
            LogoKind::Image { file } => {
                let bytes = self.logos.get(file).await?;
                Ok(Some(LogoAsset::from_file(file, bytes)))
            }
            LogoKind::Text { .. } | LogoKind::None => Ok(None),
        }
    }

    async fn composite_one(
        &self,
        logo: &LogoSettings,
        asset: Option<Arc<LogoAsset>>,
        filename: &str,
    ) -> Result<(), String> {
        let base = self.images.get(filename).await.map_err(|e| e.to_string())?;
        let compositor = self.compositor.clone();
        let settings = logo.clone();
        let output = tokio::task::spawn_blocking(move || {
            compositor.apply(&base, &settings, asset.as_deref())
        })
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;

        self.images
            .put(filename, &output)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn stage(&self, job: &Job, stage: JobStage, index: Option<u32>) {
        self.bus.publish(JobEvent::stage(
            job.id,
            job.correlation_id.clone(),
            stage,
            index,
        ));
    }
}
