//! Anchor placement math.
//!
//! All coordinates are computed against the overlay's final (post-scale,
//! post-rotation) size. Results are rounded to the nearest pixel and never
//! clamped to the canvas: an offset may push the overlay partly or fully
//! outside the base image.

use prodshot_core::logo::Position;

/// Distance in pixels between an edge-anchored overlay and the canvas edge.
pub const EDGE_PADDING: u32 = 20;

/// Geometry of one overlay-onto-base blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeOperation {
    pub base_width: u32,
    pub base_height: u32,
    pub overlay_width: u32,
    pub overlay_height: u32,
    /// Resolved x of the overlay's top-left corner (may be negative).
    pub left: i64,
    /// Resolved y of the overlay's top-left corner (may be negative).
    pub top: i64,
}

impl CompositeOperation {
    /// Compute the placement of a `overlay`-sized bitmap on a `base`-sized canvas.
    pub fn resolve(
        position: Position,
        base: (u32, u32),
        overlay: (u32, u32),
        offset: (i32, i32),
    ) -> Self {
        let (left, top) = resolve_placement(position, base, overlay, offset);
        Self {
            base_width: base.0,
            base_height: base.1,
            overlay_width: overlay.0,
            overlay_height: overlay.1,
            left,
            top,
        }
    }

    /// Exclusive right edge of the overlay.
    pub fn right(&self) -> i64 {
        self.left + i64::from(self.overlay_width)
    }

    /// Exclusive bottom edge of the overlay.
    pub fn bottom(&self) -> i64 {
        self.top + i64::from(self.overlay_height)
    }
}

/// Top-left coordinate of an overlay for the given anchor and offset.
///
/// | position      | left          | top           |
/// |---------------|---------------|---------------|
/// | center        | `(W-w)/2`     | `(H-h)/2`     |
/// | top-*         | `P` / `(W-w)/2` / `W-w-P` | `P` |
/// | middle-*      | `P` / `W-w-P` | `(H-h)/2`     |
/// | bottom-*      | `P` / `(W-w)/2` / `W-w-P` | `H-h-P` |
pub fn resolve_placement(
    position: Position,
    base: (u32, u32),
    overlay: (u32, u32),
    offset: (i32, i32),
) -> (i64, i64) {
    let (base_w, base_h) = (f64::from(base.0), f64::from(base.1));
    let (w, h) = (f64::from(overlay.0), f64::from(overlay.1));
    let p = f64::from(EDGE_PADDING);

    let center_x = (base_w - w) / 2.0;
    let center_y = (base_h - h) / 2.0;
    let right = base_w - w - p;
    let bottom = base_h - h - p;

    let (left, top) = match position {
        Position::Center => (center_x, center_y),
        Position::TopLeft => (p, p),
        Position::TopCenter => (center_x, p),
        Position::TopRight => (right, p),
        Position::MiddleLeft => (p, center_y),
        Position::MiddleRight => (right, center_y),
        Position::BottomLeft => (p, bottom),
        Position::BottomCenter => (center_x, bottom),
        Position::BottomRight => (right, bottom),
    };

    (
        (left + f64::from(offset.0)).round() as i64,
        (top + f64::from(offset.1)).round() as i64,
    )
}

/// Overlay width for a `size` percent of `base_width`, at least one pixel.
pub fn target_overlay_width(base_width: u32, size_percent: u32) -> u32 {
    let width = (f64::from(base_width) * f64::from(size_percent) / 100.0).round();
    (width as u32).max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const P: i64 = EDGE_PADDING as i64;

    #[test]
    fn center_law_holds_across_magnitudes() {
        let cases = [
            ((1000, 1000), (200, 100)),
            ((512, 512), (77, 33)),
            ((3, 7), (1, 1)),
            ((4096, 2160), (999, 1001)),
            ((100, 100), (300, 300)),
        ];
        for (base, overlay) in cases {
            let (left, top) = resolve_placement(Position::Center, base, overlay, (0, 0));
            let expected_left = ((f64::from(base.0) - f64::from(overlay.0)) / 2.0).round() as i64;
            let expected_top = ((f64::from(base.1) - f64::from(overlay.1)) / 2.0).round() as i64;
            assert_eq!((left, top), (expected_left, expected_top), "{base:?} {overlay:?}");
        }
    }

    #[test]
    fn padding_law_for_every_edge_anchor() {
        let (bw, bh) = (800u32, 600u32);
        let (w, h) = (120u32, 40u32);
        for position in Position::ALL.iter().copied().filter(|p| *p != Position::Center) {
            let op = CompositeOperation::resolve(position, (bw, bh), (w, h), (0, 0));
            let name = position.as_str();
            if name.starts_with("top") {
                assert_eq!(op.top, P, "{name}");
            }
            if name.starts_with("bottom") {
                assert_eq!(i64::from(bh) - op.bottom(), P, "{name}");
            }
            if name.ends_with("left") {
                assert_eq!(op.left, P, "{name}");
            }
            if name.ends_with("right") {
                assert_eq!(i64::from(bw) - op.right(), P, "{name}");
            }
        }
    }

    #[test]
    fn bottom_right_watermark_on_square_canvas() {
        let op = CompositeOperation::resolve(Position::BottomRight, (1000, 1000), (200, 57), (0, 0));
        assert_eq!((op.right(), op.bottom()), (1000 - P, 1000 - P));
    }

    #[test]
    fn offsets_are_added_without_clamping() {
        let (left, top) = resolve_placement(Position::TopLeft, (100, 100), (50, 50), (-500, 900));
        assert_eq!((left, top), (P - 500, P + 900));
    }

    #[test]
    fn half_pixel_centers_round_to_nearest() {
        // (101 - 50) / 2 = 25.5 rounds away from zero.
        let (left, _) = resolve_placement(Position::TopCenter, (101, 100), (50, 10), (0, 0));
        assert_eq!(left, 26);
    }

    #[test]
    fn target_width_is_percent_of_base() {
        assert_eq!(target_overlay_width(1000, 20), 200);
        assert_eq!(target_overlay_width(512, 15), 77);
        assert_eq!(target_overlay_width(3, 5), 1);
    }
}
