use std::sync::Arc;

use prodshot_core::storage::BlobStorage;
use prodshot_pipeline::{CompletionBridge, JobQueue};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: prodshot_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Producer side of the job queue.
    pub queue: JobQueue,
    /// Submit-and-wait over the queue, for `POST /generate`.
    pub bridge: CompletionBridge,
    /// Generated images.
    pub images: Arc<dyn BlobStorage>,
    /// Uploaded logos.
    pub logos: Arc<dyn BlobStorage>,
}
