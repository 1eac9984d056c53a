//! Handlers for logo uploads used by image-type overlays.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use prodshot_core::error::CoreError;
use prodshot_core::naming::logo_upload_filename;
use prodshot_core::storage::StoredFile;
use prodshot_core::upload::validate_logo_upload;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
}

/// POST /api/v1/logos (multipart, single file field)
///
/// The stored filename is what a request's `logo.content` refers to.
pub async fn upload_logo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

        let ext = validate_logo_upload(&original_name, bytes.len())?;
        let filename = logo_upload_filename(Utc::now().timestamp_millis(), &ext);
        let stored = state.logos.put(&filename, &bytes).await?;

        tracing::info!(
            filename = %stored.filename,
            original_name = %original_name,
            size = bytes.len(),
            "Logo uploaded",
        );
        return Ok(Json(UploadResponse {
            success: true,
            filename: stored.filename,
            url: stored.url,
        }));
    }

    Err(AppError::Core(CoreError::Validation(
        "No file was uploaded".to_string(),
    )))
}

/// GET /api/v1/logos
pub async fn list_logos(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<StoredFile>>>> {
    let files = state
        .logos
        .list()
        .await?
        .into_iter()
        .map(|filename| StoredFile {
            url: state.logos.url_for(&filename),
            filename,
        })
        .collect();
    Ok(Json(DataResponse { data: files }))
}

/// DELETE /api/v1/logos/{filename}
///
/// 204 when removed, 404 when no such logo exists.
pub async fn delete_logo(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<StatusCode> {
    if state.logos.delete(&filename).await? {
        tracing::info!(%filename, "Logo deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Logo",
            id: filename,
        }))
    }
}
