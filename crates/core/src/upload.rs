//! Logo upload constraints.

use crate::error::CoreError;

/// Maximum accepted logo upload size (5 MiB).
pub const MAX_LOGO_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Extensions accepted for logo uploads (raster and SVG).
pub const ALLOWED_LOGO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

/// Validate an uploaded logo and return its normalized (lowercase) extension.
pub fn validate_logo_upload(original_name: &str, size_bytes: usize) -> Result<String, CoreError> {
    if size_bytes == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".to_string()));
    }
    if size_bytes > MAX_LOGO_UPLOAD_BYTES {
        return Err(CoreError::Validation(format!(
            "Logo file exceeds the {} MB limit",
            MAX_LOGO_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let ext = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_LOGO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported logo file type '{original_name}'. Allowed extensions: {}",
            ALLOWED_LOGO_EXTENSIONS.join(", ")
        )))
    }
}

/// Whether a stored logo filename refers to an SVG document.
pub fn is_svg_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".svg")
}
