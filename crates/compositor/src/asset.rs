//! Logo assets loaded from logo storage.

use image::RgbaImage;
use prodshot_core::upload::is_svg_filename;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

use crate::transform::pixmap_to_rgba;
use crate::CompositeError;

/// Raw bytes of an uploaded logo, tagged by how they must be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoAsset {
    Raster(Vec<u8>),
    Svg(Vec<u8>),
}

impl LogoAsset {
    /// Classify stored bytes by their filename.
    pub fn from_file(filename: &str, bytes: Vec<u8>) -> Self {
        if is_svg_filename(filename) {
            Self::Svg(bytes)
        } else {
            Self::Raster(bytes)
        }
    }

    /// Decode to RGBA.
    ///
    /// Vector logos are rasterized directly at `target_width` so the later
    /// scale step does not upsample a small intrinsic size.
    pub(crate) fn decode(
        &self,
        options: &usvg::Options<'_>,
        target_width: u32,
    ) -> Result<RgbaImage, CompositeError> {
        match self {
            Self::Raster(bytes) => Ok(image::load_from_memory(bytes)?.to_rgba8()),
            Self::Svg(bytes) => rasterize_svg(options, bytes, target_width),
        }
    }
}

fn rasterize_svg(
    options: &usvg::Options<'_>,
    bytes: &[u8],
    target_width: u32,
) -> Result<RgbaImage, CompositeError> {
    let tree =
        usvg::Tree::from_data(bytes, options).map_err(|e| CompositeError::Render(e.to_string()))?;
    let size = tree.size();
    let scale = target_width.max(1) as f32 / size.width();
    let width = target_width.max(1);
    let height = (size.height() * scale).round().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        CompositeError::Render(format!("cannot allocate {width}x{height} pixmap"))
    })?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Ok(pixmap_to_rgba(&pixmap))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_SVG: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5" viewBox="0 0 10 5"><rect width="10" height="5" fill="#0000ff"/></svg>"##;

    #[test]
    fn classifies_by_extension() {
        assert!(matches!(LogoAsset::from_file("a.svg", vec![]), LogoAsset::Svg(_)));
        assert!(matches!(LogoAsset::from_file("a.png", vec![]), LogoAsset::Raster(_)));
    }

    #[test]
    fn svg_is_rasterized_at_target_width() {
        let asset = LogoAsset::Svg(SQUARE_SVG.to_vec());
        let img = asset.decode(&usvg::Options::default(), 200).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        assert_eq!(img.get_pixel(100, 50).0, [0, 0, 255, 255]);
    }

    #[test]
    fn garbage_raster_is_a_decode_error() {
        let asset = LogoAsset::Raster(b"nope".to_vec());
        assert!(matches!(
            asset.decode(&usvg::Options::default(), 10),
            Err(CompositeError::Decode(_))
        ));
    }
}
