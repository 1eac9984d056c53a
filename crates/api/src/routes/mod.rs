pub mod health;
pub mod images;
pub mod jobs;
pub mod logos;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                   submit and wait for the images (POST)
///
/// /jobs                       list, submit without waiting
/// /jobs/stats                 job counts per status
/// /jobs/{id}                  job status and result
///
/// /options                    accepted vocabularies and limits
///
/// /logos                      list, upload (multipart)
/// /logos/{filename}           delete
///
/// /images                     list generated images
/// /images/{filename}          delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(handlers::generate::generate))
        .route("/options", get(handlers::options::list_options))
        .nest("/jobs", jobs::router())
        .nest("/logos", logos::router())
        .nest("/images", images::router())
}
