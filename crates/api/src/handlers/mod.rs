pub mod generate;
pub mod images;
pub mod jobs;
pub mod logos;
pub mod options;

use axum::http::HeaderMap;

/// Correlation id for a request: the `x-request-id` set by the request-id
/// middleware, or a fresh UUID when absent.
pub(crate) fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
