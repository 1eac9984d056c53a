#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgba, RgbaImage};
use prodshot_api::config::ServerConfig;
use prodshot_api::router::build_app_router;
use prodshot_api::state::AppState;
use prodshot_compositor::Compositor;
use prodshot_core::storage::LocalStorage;
use prodshot_db::DbPool;
use prodshot_events::EventBus;
use prodshot_pipeline::config::{IMAGE_URL_PREFIX, LOGO_URL_PREFIX};
use prodshot_pipeline::{JobQueue, Pipeline, PipelineConfig, Worker, WorkerOptions};
use prodshot_synthesis::{ImageSynthesizer, SynthesisError, SynthesisRequest};
use tempfile::TempDir;
use tower::ServiceExt;

pub const MULTIPART_BOUNDARY: &str = "prodshot-test-boundary";

// ---------------------------------------------------------------------------
// Synthesizers
// ---------------------------------------------------------------------------

/// Returns a grey PNG at the requested size.
pub struct FakeSynthesizer;

#[async_trait]
impl ImageSynthesizer for FakeSynthesizer {
    async fn generate(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        Ok(png(request.width, request.height))
    }
}

/// Always fails.
pub struct BrokenSynthesizer;

#[async_trait]
impl ImageSynthesizer for BrokenSynthesizer {
    async fn generate(&self, _request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        Err(SynthesisError::Api {
            status: 500,
            body: "model crashed".to_string(),
        })
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([128, 128, 128, 255]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A fully wired app over a temporary database and storage directories.
pub struct TestApp {
    pub dir: TempDir,
    pub pool: DbPool,
    pub router: Router,
    pub pipeline: Pipeline,
}

impl TestApp {
    /// App with no worker: jobs stay waiting.
    pub async fn without_worker() -> Self {
        Self::build(None).await
    }

    /// App with an embedded worker backed by `synthesizer`.
    pub async fn with_worker(synthesizer: Arc<dyn ImageSynthesizer>) -> Self {
        Self::build(Some(synthesizer)).await
    }

    async fn build(synthesizer: Option<Arc<dyn ImageSynthesizer>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.embedded_worker = synthesizer.is_some();

        let pool = prodshot_db::create_pool(&config.pipeline.database_url)
            .await
            .unwrap();
        prodshot_db::run_migrations(&pool).await.unwrap();

        let images = Arc::new(
            LocalStorage::open(&config.pipeline.image_dir, IMAGE_URL_PREFIX)
                .await
                .unwrap(),
        );
        let logos = Arc::new(
            LocalStorage::open(&config.pipeline.logo_dir, LOGO_URL_PREFIX)
                .await
                .unwrap(),
        );

        let queue = JobQueue::new(pool.clone());
        let bus = Arc::new(EventBus::default());
        let worker = synthesizer.map(|synthesizer| {
            Worker::new(
                queue.clone(),
                bus.clone(),
                synthesizer,
                images.clone(),
                logos.clone(),
                Compositor::new(),
                WorkerOptions {
                    poll_interval: std::time::Duration::from_millis(50),
                    rate_limit_max_jobs: 100,
                    ..WorkerOptions::default()
                },
            )
        });
        let pipeline = Pipeline::start(queue.clone(), bus, worker).await.unwrap();

        let state = AppState {
            pool: pool.clone(),
            config: Arc::new(config.clone()),
            queue,
            bridge: pipeline.bridge(),
            images,
            logos,
        };
        let router = build_app_router(state, &config);

        Self {
            dir,
            pool,
            router,
            pipeline,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST a single-file multipart form with field name `logo`.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Response<Body> {
        self.send(
            Request::post("/api/v1/logos")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
                )
                .body(Body::from(multipart_file("logo", filename, bytes)))
                .unwrap(),
        )
        .await
    }
}

/// Config pointing every path into `dir`, with a short generation timeout.
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        generation_timeout_secs: 2,
        embedded_worker: true,
        pipeline: PipelineConfig {
            database_url: format!("sqlite://{}", dir.path().join("jobs.db").display()),
            image_dir: dir.path().join("images"),
            logo_dir: dir.path().join("logos"),
            ..PipelineConfig::default()
        },
    }
}

pub fn multipart_file(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{MULTIPART_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
