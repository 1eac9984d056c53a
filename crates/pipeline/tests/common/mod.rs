#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use prodshot_compositor::Compositor;
use prodshot_core::storage::LocalStorage;
use prodshot_db::DbPool;
use prodshot_events::EventBus;
use prodshot_pipeline::{JobQueue, Worker, WorkerOptions};
use prodshot_synthesis::{ImageSynthesizer, SynthesisError, SynthesisRequest};
use tempfile::TempDir;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Job store, storage directories and event bus in a temporary directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: DbPool,
    pub queue: JobQueue,
    pub bus: Arc<EventBus>,
    pub images: Arc<LocalStorage>,
    pub logos: Arc<LocalStorage>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_pool(&dir).await;
        let images = LocalStorage::open(dir.path().join("images"), "/images")
            .await
            .unwrap();
        let logos = LocalStorage::open(dir.path().join("logos"), "/uploads/logos")
            .await
            .unwrap();

        Self {
            queue: JobQueue::new(pool.clone()),
            pool,
            bus: Arc::new(EventBus::default()),
            images: Arc::new(images),
            logos: Arc::new(logos),
            dir,
        }
    }

    /// A second connection pool on the same database file, as another
    /// process would open it.
    pub async fn second_pool(&self) -> DbPool {
        open_pool(&self.dir).await
    }

    pub fn worker(&self, synthesizer: Arc<ScriptedSynthesizer>, options: WorkerOptions) -> Worker {
        Worker::new(
            self.queue.clone(),
            self.bus.clone(),
            synthesizer,
            self.images.clone(),
            self.logos.clone(),
            Compositor::new(),
            options,
        )
    }
}

async fn open_pool(dir: &TempDir) -> DbPool {
    let url = format!("sqlite://{}", dir.path().join("jobs.db").display());
    let pool = prodshot_db::create_pool(&url).await.unwrap();
    prodshot_db::run_migrations(&pool).await.unwrap();
    pool
}

/// Options with a fast poll and no effective rate limit.
pub fn fast_options() -> WorkerOptions {
    WorkerOptions {
        poll_interval: Duration::from_millis(25),
        rate_limit_max_jobs: 100,
        rate_limit_window: Duration::from_secs(60),
        ..WorkerOptions::default()
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub fn solid_png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, color);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

// ---------------------------------------------------------------------------
// Scripted synthesizer
// ---------------------------------------------------------------------------

/// One scripted synthesis call.
#[derive(Debug, Clone)]
pub enum Step {
    /// A white PNG at the requested size.
    Image,
    /// A white PNG of the given size, regardless of the request.
    ImageSized(u32, u32),
    Fail,
}

/// Synthesizer that plays back a script and records every request.
///
/// Once the script is exhausted every call returns [`Step::Image`].
#[derive(Default)]
pub struct ScriptedSynthesizer {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<SynthesisRequest>>,
    delay: Option<Duration>,
}

impl ScriptedSynthesizer {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::new([])
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageSynthesizer for ScriptedSynthesizer {
    async fn generate(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Image);
        match step {
            Step::Image => Ok(solid_png(request.width, request.height, WHITE)),
            Step::ImageSized(w, h) => Ok(solid_png(w, h, WHITE)),
            Step::Fail => Err(SynthesisError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            }),
        }
    }
}
