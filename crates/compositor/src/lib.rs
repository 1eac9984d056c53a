//! Logo and text watermark compositing for generated product photos.
//!
//! [`Compositor::apply`] decodes a base image, prepares the overlay
//! (raster/SVG logo or rendered text), scales it to a percentage of the base
//! width, rotates it, applies opacity, resolves its anchor position and
//! blends it "over" the base. The output is re-encoded in the base image's
//! own format.

pub mod asset;
pub mod placement;
pub mod text;
pub mod transform;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbaImage};
use prodshot_core::logo::{LogoKind, LogoSettings};
use resvg::usvg::{self, fontdb};

pub use asset::LogoAsset;
pub use placement::{CompositeOperation, EDGE_PADDING};

/// Generic family names are bound to the first installed match.
const PREFERRED_SANS_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("Logo asset missing for '{0}'")]
    MissingAsset(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to render overlay: {0}")]
    Render(String),

    #[error("Overlay rendered no visible pixels")]
    EmptyOverlay,
}

// ---------------------------------------------------------------------------
// Prepared overlay
// ---------------------------------------------------------------------------

/// Overlay bitmap after scale, rotation and opacity, with its placement.
#[derive(Debug, Clone)]
pub struct PreparedOverlay {
    pub image: RgbaImage,
    pub operation: CompositeOperation,
}

/// Scale, rotate, fade and place a raw overlay for a `base`-sized canvas.
///
/// Placement is computed from the rotated bounding box, so the anchor
/// padding holds for any rotation.
pub fn prepare_overlay(
    raw: &RgbaImage,
    settings: &LogoSettings,
    base: (u32, u32),
) -> Result<PreparedOverlay, CompositeError> {
    let target_width = placement::target_overlay_width(base.0, settings.size);
    let scaled = transform::scale_to_width(raw, target_width);
    let mut image = transform::rotate(&scaled, settings.rotation)?;
    transform::apply_opacity(&mut image, settings.opacity);

    let operation = CompositeOperation::resolve(
        settings.position,
        base,
        image.dimensions(),
        (settings.offset_x, settings.offset_y),
    );
    Ok(PreparedOverlay { image, operation })
}

// ---------------------------------------------------------------------------
// Compositor
// ---------------------------------------------------------------------------

/// Stateless compositor holding the font database used for text and SVG.
#[derive(Clone)]
pub struct Compositor {
    fontdb: Arc<fontdb::Database>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

impl Compositor {
    /// Compositor using the system fonts.
    pub fn new() -> Self {
        Self::with_font_dir(None::<&Path>)
    }

    /// Compositor using the system fonts plus every font under `dir`.
    pub fn with_font_dir(dir: Option<impl AsRef<Path>>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = dir {
            db.load_fonts_dir(dir);
        }
        bind_generic_families(&mut db);
        tracing::debug!(faces = db.len(), "Compositor font database loaded");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Whether any font face is available for text watermarks.
    pub fn has_fonts(&self) -> bool {
        !self.fontdb.is_empty()
    }

    /// SVG parsing options sharing this compositor's font database.
    pub fn svg_options(&self) -> usvg::Options<'static> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        options
    }

    /// Composite the configured logo onto `base` and return the encoded image.
    ///
    /// `asset` must be supplied for image logos. With no logo configured the
    /// input bytes are returned unchanged.
    pub fn apply(
        &self,
        base: &[u8],
        settings: &LogoSettings,
        asset: Option<&LogoAsset>,
    ) -> Result<Vec<u8>, CompositeError> {
        if settings.kind.is_none() {
            return Ok(base.to_vec());
        }

        let format = image::guess_format(base)?;
        let mut canvas = image::load_from_memory_with_format(base, format)?.to_rgba8();
        let dims = canvas.dimensions();
        let options = self.svg_options();

        let raw = match &settings.kind {
            LogoKind::None => return Ok(base.to_vec()),
            LogoKind::Image { file } => {
                let asset = asset.ok_or_else(|| CompositeError::MissingAsset(file.clone()))?;
                let target_width = placement::target_overlay_width(dims.0, settings.size);
                asset.decode(&options, target_width)?
            }
            LogoKind::Text {
                text,
                color,
                font_family,
            } => {
                if text.trim().is_empty() {
                    return Err(CompositeError::MissingAsset("watermark text".to_string()));
                }
                text::render_text(&options, text, color, font_family, dims.0, settings.size)?
            }
        };

        let prepared = prepare_overlay(&raw, settings, dims)?;
        tracing::debug!(
            kind = settings.kind.type_name(),
            left = prepared.operation.left,
            top = prepared.operation.top,
            width = prepared.operation.overlay_width,
            height = prepared.operation.overlay_height,
            "Blending overlay",
        );
        image::imageops::overlay(
            &mut canvas,
            &prepared.image,
            prepared.operation.left,
            prepared.operation.top,
        );

        encode(canvas, format)
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Resolution conformance
// ---------------------------------------------------------------------------

/// Read the pixel dimensions from the image header without decoding pixels.
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), CompositeError> {
    Ok(image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompositeError::Decode(image::ImageError::IoError(e)))?
        .into_dimensions()?)
}

/// Resize-to-fill `bytes` to exactly `width`x`height`.
///
/// Bytes already at the requested size are returned untouched.
pub fn conform_to_resolution(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, CompositeError> {
    if image_dimensions(bytes)? == (width, height) {
        return Ok(bytes.to_vec());
    }
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let filled = img.resize_to_fill(width, height, image::imageops::FilterType::Lanczos3);
    encode(filled.to_rgba8(), format)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn encode(canvas: RgbaImage, format: ImageFormat) -> Result<Vec<u8>, CompositeError> {
    let mut buf = Cursor::new(Vec::new());
    let img = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        _ => DynamicImage::ImageRgba8(canvas),
    };
    img.write_to(&mut buf, format)
        .map_err(CompositeError::Encode)?;
    Ok(buf.into_inner())
}

fn bind_generic_families(db: &mut fontdb::Database) {
    let installed: Vec<String> = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
        .collect();

    let chosen = PREFERRED_SANS_FAMILIES
        .iter()
        .find(|preferred| installed.iter().any(|name| name == *preferred))
        .map(|name| name.to_string())
        .or_else(|| installed.first().cloned());

    if let Some(name) = chosen {
        db.set_sans_serif_family(name);
    }
}
