//! Job results shared by the queue, the worker and the HTTP layer.

use serde::{Deserialize, Serialize};

use crate::storage::StoredFile;

/// One delivered image.
pub type GeneratedImage = StoredFile;

/// Outcome of a completed job.
///
/// `images` holds one entry per image that was produced and persisted, in
/// index order. It may be shorter than the requested count but is never
/// empty for a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub images: Vec<GeneratedImage>,
    /// Exact prompt text sent to the synthesis service.
    pub prompt: String,
}
