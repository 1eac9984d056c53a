//! Route definitions for the `/images` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// GET    /                -> list_images
/// DELETE /{filename}      -> delete_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(images::list_images))
        .route("/{filename}", delete(images::delete_image))
}
