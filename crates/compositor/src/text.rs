//! Text watermark rasterization.
//!
//! The watermark is laid out as a small SVG document (centered bold text with
//! a translucent dark stroke painted beneath the fill) and rendered with
//! resvg onto a transparent canvas as wide as the base image. The result is
//! trimmed to its visible pixels and then goes through the same
//! scale/rotate/opacity pipeline as image logos.

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

use crate::transform::{pixmap_to_rgba, trim_transparent};
use crate::CompositeError;

/// Target text height relative to the overlay width implied by `size`.
pub const TEXT_HEIGHT_RATIO: f64 = 0.5;

/// Font size relative to the text canvas height.
const FONT_SIZE_RATIO: f64 = 0.8;

/// Average advance of one glyph relative to the font size, used to shrink
/// long strings so they fit on the canvas.
const GLYPH_ADVANCE_RATIO: f64 = 0.6;

/// Stroke width relative to the font size.
const STROKE_RATIO: f64 = 1.0 / 24.0;

/// Canvas size for a watermark at `size_percent` on a `base_width` image.
///
/// The canvas spans the full base width; its height is proportional to the
/// overlay width the same `size` would give an image logo.
pub fn text_canvas_size(base_width: u32, size_percent: u32) -> (u32, u32) {
    let overlay_width = f64::from(base_width) * f64::from(size_percent) / 100.0;
    let height = (overlay_width * TEXT_HEIGHT_RATIO).round().max(1.0) as u32;
    (base_width.max(1), height)
}

/// Build the SVG document for a watermark on a `width`x`height` canvas.
pub fn watermark_svg(text: &str, color: &str, font_family: &str, width: u32, height: u32) -> String {
    let (w, h) = (f64::from(width), f64::from(height));
    let chars = text.chars().count().max(1) as f64;
    let fitted = (w * 0.95) / (chars * GLYPH_ADVANCE_RATIO);
    let font_size = (h * FONT_SIZE_RATIO).min(fitted).max(1.0);
    let stroke = (font_size * STROKE_RATIO).max(1.0);

    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<text x="{cx:.1}" y="{cy:.1}" text-anchor="middle" dominant-baseline="central" "#,
            r#"font-family="{family}, sans-serif" font-size="{size:.1}" font-weight="bold" "#,
            r##"fill="{fill}" stroke="#000000" stroke-opacity="0.5" stroke-width="{stroke:.1}" "##,
            r#"paint-order="stroke">{text}</text></svg>"#
        ),
        w = width,
        h = height,
        cx = w / 2.0,
        cy = h / 2.0,
        family = xml_escape(font_family),
        size = font_size,
        fill = xml_escape(color),
        stroke = stroke,
        text = xml_escape(text),
    )
}

/// Rasterize the watermark and trim it to its visible pixels.
pub fn render_text(
    options: &usvg::Options<'_>,
    text: &str,
    color: &str,
    font_family: &str,
    base_width: u32,
    size_percent: u32,
) -> Result<image::RgbaImage, CompositeError> {
    let (width, height) = text_canvas_size(base_width, size_percent);
    let svg = watermark_svg(text, color, font_family, width, height);

    let tree = usvg::Tree::from_str(&svg, options)
        .map_err(|e| CompositeError::Render(e.to_string()))?;
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        CompositeError::Render(format!("cannot allocate {width}x{height} pixmap"))
    })?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

    trim_transparent(&pixmap_to_rgba(&pixmap)).ok_or(CompositeError::EmptyOverlay)
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_height_follows_size_percent() {
        // 20% of 1000 is a 200px overlay, half of that tall.
        assert_eq!(text_canvas_size(1000, 20), (1000, 100));
        assert_eq!(text_canvas_size(512, 15), (512, 38));
        assert_eq!(text_canvas_size(4, 5), (4, 1));
    }

    #[test]
    fn svg_escapes_markup_in_text() {
        let svg = watermark_svg("<b>A&B</b>", "#FFFFFF", "sans-serif", 100, 50);
        assert!(svg.contains("&lt;b&gt;A&amp;B&lt;/b&gt;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn svg_paints_stroke_beneath_fill() {
        let svg = watermark_svg("AB", "red", "Arial", 1000, 500);
        assert!(svg.contains(r#"paint-order="stroke""#));
        assert!(svg.contains(r#"fill="red""#));
        assert!(svg.contains(r#"font-family="Arial, sans-serif""#));
        // 80% of the 500px canvas height.
        assert!(svg.contains(r#"font-size="400.0""#));
    }

    #[test]
    fn long_text_shrinks_font_to_fit() {
        let text = "x".repeat(100);
        let svg = watermark_svg(&text, "#000", "sans-serif", 1000, 500);
        // 950 / (100 * 0.6)
        assert!(svg.contains(r#"font-size="15.8""#));
    }
}
