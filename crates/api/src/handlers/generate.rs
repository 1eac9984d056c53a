//! Handler for `POST /api/v1/generate`.
//!
//! Validates the request, enqueues a job and waits for it through the
//! completion bridge, so the caller gets the images in one round trip.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use prodshot_core::job::GeneratedImage;
use prodshot_core::request::{GenerateImageRequest, GenerationRequest};
use prodshot_core::types::JobId;
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::correlation_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub images: Vec<GeneratedImage>,
    pub metadata: GenerateMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMetadata {
    /// Exact prompt sent to the synthesis service.
    pub prompt: String,
    /// The validated request, with defaults resolved.
    pub settings: GenerationRequest,
    pub job_id: JobId,
}

/// POST /api/v1/generate
///
/// 200 with the images on success, 400 on validation failure, 500 with
/// `images: []` when the job fails and 504 when it does not finish within
/// the generation timeout (the job keeps running).
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(input) = payload?;
    let request = input.validate()?;
    let correlation_id = correlation_id(&headers);

    let submission = state
        .bridge
        .submit(request.clone(), correlation_id.as_str())
        .await?;
    let job_id = submission.job_id();
    tracing::info!(
        %job_id,
        %correlation_id,
        num_images = request.num_images,
        logo = request.logo.as_ref().map(|l| l.kind.type_name()).unwrap_or("none"),
        "Generation requested",
    );

    let result = submission.wait(state.config.generation_timeout()).await?;

    Ok(Json(GenerateResponse {
        success: true,
        images: result.images,
        metadata: GenerateMetadata {
            prompt: result.prompt,
            settings: request,
            job_id,
        },
    }))
}
