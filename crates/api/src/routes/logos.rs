//! Route definitions for the `/logos` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get};
use axum::Router;
use prodshot_core::upload::MAX_LOGO_UPLOAD_BYTES;

use crate::handlers::logos;
use crate::state::AppState;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/logos`.
///
/// ```text
/// GET    /                -> list_logos
/// POST   /                -> upload_logo (multipart)
/// DELETE /{filename}      -> delete_logo
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(logos::list_logos).post(logos::upload_logo))
        .route("/{filename}", delete(logos::delete_logo))
        .layer(DefaultBodyLimit::max(
            MAX_LOGO_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
        ))
}
