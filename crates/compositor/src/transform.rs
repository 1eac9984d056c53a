//! Overlay bitmap transforms: scale, rotate, opacity, trim.
//!
//! Rotation goes through tiny-skia so the rotated bitmap is resampled with
//! bicubic filtering into a canvas sized to the rotated bounding box.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::CompositeError;

// ---------------------------------------------------------------------------
// Pixmap conversion
// ---------------------------------------------------------------------------

/// Straight-alpha RGBA to a premultiplied tiny-skia pixmap.
pub(crate) fn rgba_to_pixmap(img: &RgbaImage) -> Result<Pixmap, CompositeError> {
    let mut pixmap = Pixmap::new(img.width(), img.height()).ok_or_else(|| {
        CompositeError::Render(format!(
            "cannot allocate {}x{} pixmap",
            img.width(),
            img.height()
        ))
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Premultiplied pixmap back to straight-alpha RGBA.
pub(crate) fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

/// Resize to `width` pixels wide, preserving aspect ratio.
pub fn scale_to_width(img: &RgbaImage, width: u32) -> RgbaImage {
    let width = width.max(1);
    if img.width() == width {
        return img.clone();
    }
    let height = (f64::from(img.height()) * f64::from(width) / f64::from(img.width().max(1)))
        .round()
        .max(1.0) as u32;
    imageops::resize(img, width, height, FilterType::Lanczos3)
}

// ---------------------------------------------------------------------------
// Rotate
// ---------------------------------------------------------------------------

/// Size of the axis-aligned box enclosing a `w`x`h` rectangle rotated by
/// `degrees` about its center.
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let radians = f64::from(degrees).to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    // Trig noise at multiples of 90 degrees must not add a pixel.
    let fit = |v: f64| ((v - 1e-6).ceil().max(1.0)) as u32;
    (fit(w * cos + h * sin), fit(w * sin + h * cos))
}

/// Rotate clockwise by `degrees` (positive = clockwise in screen space).
///
/// The output is expanded to the rotated bounding box; uncovered corners are
/// fully transparent.
pub fn rotate(img: &RgbaImage, degrees: f32) -> Result<RgbaImage, CompositeError> {
    if degrees % 360.0 == 0.0 {
        return Ok(img.clone());
    }

    let (w, h) = (img.width(), img.height());
    let (bw, bh) = rotated_bounds(w, h, degrees);
    let source = rgba_to_pixmap(img)?;
    let mut target = Pixmap::new(bw, bh)
        .ok_or_else(|| CompositeError::Render(format!("cannot allocate {bw}x{bh} pixmap")))?;

    let transform = Transform::from_rotate_at(degrees, w as f32 / 2.0, h as f32 / 2.0)
        .post_translate((bw as f32 - w as f32) / 2.0, (bh as f32 - h as f32) / 2.0);
    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

    Ok(pixmap_to_rgba(&target))
}

// ---------------------------------------------------------------------------
// Opacity
// ---------------------------------------------------------------------------

/// Multiply every pixel's alpha by `opacity / 100`.
pub fn apply_opacity(img: &mut RgbaImage, opacity: u8) {
    if opacity >= 100 {
        return;
    }
    let factor = f32::from(opacity) / 100.0;
    for pixel in img.pixels_mut() {
        pixel.0[3] = (f32::from(pixel.0[3]) * factor).round() as u8;
    }
}

// ---------------------------------------------------------------------------
// Trim
// ---------------------------------------------------------------------------

/// Crop to the bounding box of non-transparent pixels.
///
/// Returns `None` when every pixel is fully transparent.
pub fn trim_transparent(img: &RgbaImage) -> Option<RgbaImage> {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    let mut any = false;

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        any = true;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    any.then(|| {
        imageops::crop_imm(img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, alpha: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, alpha]))
    }

    // -- scale --

    #[test]
    fn scale_preserves_aspect_ratio() {
        let scaled = scale_to_width(&solid(400, 100, 255), 200);
        assert_eq!(scaled.dimensions(), (200, 50));
    }

    #[test]
    fn scale_to_same_width_is_identity() {
        let img = solid(10, 7, 255);
        assert_eq!(scale_to_width(&img, 10), img);
    }

    // -- rotate --

    #[test]
    fn rotated_bounds_quarter_turn_swaps_dimensions() {
        assert_eq!(rotated_bounds(100, 50, 90.0), (50, 100));
        assert_eq!(rotated_bounds(100, 50, -270.0), (50, 100));
        assert_eq!(rotated_bounds(100, 50, 180.0), (100, 50));
    }

    #[test]
    fn rotated_bounds_diagonal_grows() {
        assert_eq!(rotated_bounds(100, 100, 45.0), (142, 142));
    }

    #[test]
    fn full_turn_is_identity() {
        let img = solid(30, 20, 255);
        assert_eq!(rotate(&img, 360.0).unwrap(), img);
        assert_eq!(rotate(&img, 0.0).unwrap(), img);
    }

    #[test]
    fn rotation_expands_canvas_with_transparent_corners() {
        let rotated = rotate(&solid(100, 100, 255), 45.0).unwrap();
        assert_eq!(rotated.dimensions(), (142, 142));
        assert_eq!(rotated.get_pixel(0, 0).0[3], 0);
        assert!(rotated.get_pixel(71, 71).0[3] > 250);
    }

    // -- opacity --

    #[test]
    fn opacity_multiplies_alpha() {
        let mut img = solid(2, 2, 200);
        apply_opacity(&mut img, 50);
        assert!(img.pixels().all(|p| p.0[3] == 100));
        assert!(img.pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn zero_opacity_is_fully_transparent() {
        let mut img = solid(2, 2, 255);
        apply_opacity(&mut img, 0);
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }

    // -- trim --

    #[test]
    fn trim_crops_to_opaque_bbox() {
        let mut img = solid(20, 20, 0);
        img.put_pixel(5, 6, Rgba([1, 2, 3, 255]));
        img.put_pixel(9, 12, Rgba([1, 2, 3, 255]));
        let trimmed = trim_transparent(&img).unwrap();
        assert_eq!(trimmed.dimensions(), (5, 7));
    }

    #[test]
    fn trim_of_blank_image_is_none() {
        assert!(trim_transparent(&solid(4, 4, 0)).is_none());
    }
}
