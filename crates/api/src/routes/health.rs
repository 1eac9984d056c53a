use axum::extract::State;
use axum::{routing::get, Json, Router};
use prodshot_db::repositories::JobRepo;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the job store is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// `embedded` when this process runs the worker, else `external`.
    pub worker: &'static str,
    /// Jobs not yet finished. Absent when the store cannot be read.
    pub queue: Option<QueueDepth>,
}

#[derive(Serialize)]
pub struct QueueDepth {
    pub waiting: i64,
    pub active: i64,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue = match JobRepo::count_by_status(&state.pool).await {
        Ok(counts) => Some(QueueDepth {
            waiting: counts.waiting,
            active: counts.active,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read the job store");
            None
        }
    };
    let db_healthy = queue.is_some();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        worker: if state.config.embedded_worker { "embedded" } else { "external" },
        queue,
    })
}

/// Root-level routes, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
