//! Handlers for listing and deleting generated images.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use prodshot_core::error::CoreError;
use prodshot_core::storage::StoredFile;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/images
///
/// Newest first: generated filenames start with their millisecond timestamp.
pub async fn list_images(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<StoredFile>>>> {
    let mut filenames = state.images.list().await?;
    filenames.reverse();

    let files = filenames
        .into_iter()
        .map(|filename| StoredFile {
            url: state.images.url_for(&filename),
            filename,
        })
        .collect();
    Ok(Json(DataResponse { data: files }))
}

/// DELETE /api/v1/images/{filename}
pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<StatusCode> {
    if state.images.delete(&filename).await? {
        tracing::info!(%filename, "Image deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: filename,
        }))
    }
}
