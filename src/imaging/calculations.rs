//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images. The
//! variant renderer and the composite renderer both take their geometry from
//! here, so identical inputs always produce identical dimensions and crops.

use crate::types::Layout;

/// Calculate the inside-fit size for a bounding square of `max_edge`.
///
/// The longer edge is scaled down to `max_edge` and the shorter edge follows
/// the source aspect ratio. Images already within the bound keep their size;
/// nothing is ever upscaled.
///
/// ```text
/// (4000, 3000), 2048  →  (2048, 1536)
/// (1200, 1600), 2048  →  (1200, 1600)
/// ```
pub fn calculate_fit_inside(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);

    if longer_edge <= max_edge || max_edge == 0 {
        return (orig_w, orig_h);
    }

    let ratio = max_edge as f64 / longer_edge as f64;
    if orig_w >= orig_h {
        // Landscape or square
        let h = ((orig_h as f64 * ratio).round() as u32).max(1);
        (max_edge, h)
    } else {
        // Portrait
        let w = ((orig_w as f64 * ratio).round() as u32).max(1);
        (w, max_edge)
    }
}

/// Largest centered region of `source` with the aspect ratio of `target`.
///
/// Cropping this region and scaling it to `target` frames the image exactly
/// like fill-resizing the whole source and center-cropping, but the only
/// buffer ever allocated at the target size is the output itself. An odd
/// pixel of excess goes to the far side.
///
/// ```text
/// (800, 600), (400, 400)   →  600x600 at (100, 0)
/// (2048, 1),  (1200, 1200) →  1x1 at (1023, 0)
/// ```
///
/// Both inputs must be non-zero.
pub fn calculate_cover_crop(source: (u32, u32), target: (u32, u32)) -> Rect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    // Compare aspect ratios without division: src_w/src_h vs tgt_w/tgt_h
    let wide = src_w as u64 * tgt_h as u64;
    let tall = tgt_w as u64 * src_h as u64;

    if wide > tall {
        // Source is wider: keep full height, trim the sides
        let w = ((tall as f64 / tgt_h as f64).round() as u32).clamp(1, src_w);
        Rect::new((src_w - w) / 2, 0, w, src_h)
    } else {
        // Source is taller (or equal): keep full width, trim top and bottom
        let h = ((wide as f64 / tgt_w as f64).round() as u32).clamp(1, src_h);
        Rect::new(0, (src_h - h) / 2, src_w, h)
    }
}

/// An axis-aligned region of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Regions the before and after sources are cover-fitted into.
///
/// - `SideBySide`: left and right halves (an odd pixel goes to the right).
/// - `Vertical`: top and bottom halves (an odd pixel goes to the bottom).
/// - `Diagonal`: both sources fill the whole canvas; the mask decides.
pub fn layout_regions(layout: Layout, width: u32, height: u32) -> (Rect, Rect) {
    match layout {
        Layout::SideBySide => {
            let left = width / 2;
            (
                Rect::new(0, 0, left, height),
                Rect::new(left, 0, width - left, height),
            )
        }
        Layout::Vertical => {
            let top = height / 2;
            (
                Rect::new(0, 0, width, top),
                Rect::new(0, top, width, height - top),
            )
        }
        Layout::Diagonal => (
            Rect::new(0, 0, width, height),
            Rect::new(0, 0, width, height),
        ),
    }
}

/// Whether pixel `(x, y)` lies in the upper-right triangle of a
/// `width`×`height` canvas (vertices top-left, top-right, bottom-right).
///
/// Tested at the pixel center in integer arithmetic: `(y + ½) / h ≤ (x + ½) / w`.
pub fn in_upper_right_triangle(x: u32, y: u32, width: u32, height: u32) -> bool {
    let lhs = (2 * y as u64 + 1) * width as u64;
    let rhs = (2 * x as u64 + 1) * height as u64;
    lhs <= rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // =========================================================================
    // calculate_fit_inside tests
    // =========================================================================

    #[test]
    fn fit_inside_landscape() {
        assert_eq!(calculate_fit_inside((4000, 3000), 2048), (2048, 1536));
    }

    #[test]
    fn fit_inside_portrait() {
        assert_eq!(calculate_fit_inside((3000, 4000), 2048), (1536, 2048));
    }

    #[test]
    fn fit_inside_never_upscales() {
        assert_eq!(calculate_fit_inside((500, 400), 2048), (500, 400));
        assert_eq!(calculate_fit_inside((2048, 100), 2048), (2048, 100));
    }

    #[test]
    fn fit_inside_extreme_panorama_keeps_one_pixel() {
        assert_eq!(calculate_fit_inside((100_000, 10), 2048), (2048, 1));
    }

    // =========================================================================
    // calculate_cover_crop tests
    // =========================================================================

    #[test]
    fn cover_crop_wider_source_trims_sides() {
        assert_eq!(
            calculate_cover_crop((800, 600), (400, 400)),
            Rect::new(100, 0, 600, 600)
        );
    }

    #[test]
    fn cover_crop_taller_source_trims_top_and_bottom() {
        assert_eq!(
            calculate_cover_crop((400, 600), (400, 400)),
            Rect::new(0, 100, 400, 400)
        );
    }

    #[test]
    fn cover_crop_same_aspect_keeps_everything() {
        assert_eq!(
            calculate_cover_crop((800, 600), (400, 300)),
            Rect::new(0, 0, 800, 600)
        );
    }

    #[test]
    fn cover_crop_square_source_to_wide_strip() {
        // Vertical layout half: 2400x600 from a square source
        assert_eq!(
            calculate_cover_crop((1000, 1000), (2400, 600)),
            Rect::new(0, 375, 1000, 250)
        );
    }

    #[test]
    fn cover_crop_degenerate_sources_stay_tiny() {
        assert_eq!(
            calculate_cover_crop((2048, 1), (1200, 1200)),
            Rect::new(1023, 0, 1, 1)
        );
        assert_eq!(
            calculate_cover_crop((1, 2048), (2400, 600)),
            Rect::new(0, 1023, 1, 1)
        );
    }

    // =========================================================================
    // layout_regions tests
    // =========================================================================

    #[test]
    fn side_by_side_halves() {
        let (before, after) = layout_regions(Layout::SideBySide, 2400, 1200);
        assert_eq!(before, Rect::new(0, 0, 1200, 1200));
        assert_eq!(after, Rect::new(1200, 0, 1200, 1200));
    }

    #[test]
    fn side_by_side_odd_width_gives_extra_pixel_to_after() {
        let (before, after) = layout_regions(Layout::SideBySide, 1001, 500);
        assert_eq!(before.width, 500);
        assert_eq!(after.x, 500);
        assert_eq!(after.width, 501);
    }

    #[test]
    fn vertical_halves() {
        let (before, after) = layout_regions(Layout::Vertical, 1200, 1600);
        assert_eq!(before, Rect::new(0, 0, 1200, 800));
        assert_eq!(after, Rect::new(0, 800, 1200, 800));
    }

    #[test]
    fn diagonal_regions_cover_canvas() {
        let (before, after) = layout_regions(Layout::Diagonal, 800, 600);
        assert_eq!(before, Rect::new(0, 0, 800, 600));
        assert_eq!(after, before);
    }

    // =========================================================================
    // in_upper_right_triangle tests
    // =========================================================================

    #[test]
    fn triangle_corners() {
        let (w, h) = (800, 600);
        assert!(in_upper_right_triangle(w - 1, 0, w, h));
        assert!(!in_upper_right_triangle(0, h - 1, w, h));
        assert!(in_upper_right_triangle(w - 1, h - 1, w, h));
    }

    #[test]
    fn triangle_splits_square_on_the_diagonal() {
        assert!(in_upper_right_triangle(5, 5, 10, 10));
        assert!(in_upper_right_triangle(6, 5, 10, 10));
        assert!(!in_upper_right_triangle(4, 5, 10, 10));
    }

    proptest! {
        #[test]
        fn fit_inside_respects_bound(w in 1u32..20_000, h in 1u32..20_000, max in 1u32..4096) {
            let (fw, fh) = calculate_fit_inside((w, h), max);
            prop_assert!(fw.max(fh) <= max);
            prop_assert!(fw <= w && fh <= h);
            prop_assert!(fw >= 1 && fh >= 1);
        }

        #[test]
        fn fit_inside_preserves_aspect(w in 16u32..10_000, h in 16u32..10_000) {
            let (fw, fh) = calculate_fit_inside((w, h), 2048);
            let src = w as f64 / h as f64;
            let out = fw as f64 / fh as f64;
            // One pixel of rounding on the short edge is the only distortion allowed.
            let short = fw.min(fh) as f64;
            prop_assert!((src - out).abs() / src <= 1.0 / short + 1e-9);
        }

        #[test]
        fn cover_crop_stays_inside_source(
            sw in 1u32..8000, sh in 1u32..8000, tw in 1u32..4000, th in 1u32..4000
        ) {
            let crop = calculate_cover_crop((sw, sh), (tw, th));
            prop_assert!(crop.width >= 1 && crop.height >= 1);
            prop_assert!(crop.x + crop.width <= sw && crop.y + crop.height <= sh);
            prop_assert!(crop.width == sw || crop.height == sh);
        }

        #[test]
        fn cover_crop_matches_target_aspect(
            sw in 1000u32..8000, sh in 1000u32..8000, tw in 16u32..4000, th in 16u32..4000
        ) {
            let crop = calculate_cover_crop((sw, sh), (tw, th));
            let want = tw as f64 / th as f64;
            let got = crop.width as f64 / crop.height as f64;
            // Rounding the trimmed edge to whole pixels is the only error allowed
            let short = crop.width.min(crop.height) as f64;
            prop_assert!((want - got).abs() / want <= 1.0 / short + 1e-9);
        }
    }
}
