//! Filename conventions for generated images and uploaded logos.
//!
//! Generated images are named `{timestamp_ms}_{batch_id}_{index}.{ext}`.
//! The timestamp and batch id are fixed for the whole job and the index
//! distinguishes images within it, so concurrent writers never collide.

use rand::Rng;

/// Length of the random batch id shared by all images of one job.
pub const BATCH_ID_LEN: usize = 9;

/// Length of the random suffix of uploaded logo filenames.
const UPLOAD_SUFFIX_LEN: usize = 8;

/// Generate a fresh short alphanumeric batch id.
pub fn new_batch_id() -> String {
    random_alphanumeric(BATCH_ID_LEN)
}

/// Filename of the image at `index` within a job.
///
/// # Examples
///
/// ```
/// use prodshot_core::naming::generated_image_filename;
///
/// assert_eq!(
///     generated_image_filename(1700000000000, "k3j9x0abc", 2, "png"),
///     "1700000000000_k3j9x0abc_2.png"
/// );
/// ```
pub fn generated_image_filename(timestamp_ms: i64, batch_id: &str, index: u32, ext: &str) -> String {
    format!("{timestamp_ms}_{batch_id}_{index}.{ext}")
}

/// Filename under which an uploaded logo is stored.
pub fn logo_upload_filename(timestamp_ms: i64, ext: &str) -> String {
    format!(
        "logo_{timestamp_ms}_{}.{}",
        random_alphanumeric(UPLOAD_SUFFIX_LEN).to_ascii_lowercase(),
        ext.to_ascii_lowercase()
    )
}

/// File extension matching the encoded bytes, `png` when unrecognised.
pub fn extension_for_bytes(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "jpg",
        Ok(image::ImageFormat::WebP) => "webp",
        Ok(image::ImageFormat::Gif) => "gif",
        _ => "png",
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
