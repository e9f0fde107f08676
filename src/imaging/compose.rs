//! Before/after canvas composition.
//!
//! Geometry comes from [`calculations`](super::calculations): each source is
//! cover-fitted into its layout region (center crop to the region's aspect,
//! then scale), so the canvas is always exactly the requested size whatever
//! the source aspect.
//!
//! ```text
//! SideBySide        Vertical          Diagonal
//! ┌──────┬──────┐   ┌─────────────┐   ┌─────────────┐
//! │      │      │   │   before    │   │ ╲   after   │
//! │before│after │   ├─────────────┤   │   ╲         │
//! │      │      │   │   after     │   │ before ╲    │
//! └──────┴──────┘   └─────────────┘   └─────────────┘
//! ```

use super::calculations::{Rect, calculate_cover_crop, in_upper_right_triangle, layout_regions};
use super::glyphs::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use super::params::Labels;
use crate::types::Layout;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Pixel, Rgba, RgbaImage};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LABEL_BACKDROP: Rgba<u8> = Rgba([0, 0, 0, 160]);
const LABEL_INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Render both sources onto a `size` canvas.
pub fn compose(
    before: &DynamicImage,
    after: &DynamicImage,
    layout: Layout,
    size: (u32, u32),
    labels: Option<&Labels>,
) -> RgbaImage {
    let (width, height) = size;
    let (before_region, after_region) = layout_regions(layout, width, height);
    let before_fit = cover_fit(before, before_region.width, before_region.height);
    let after_fit = cover_fit(after, after_region.width, after_region.height);

    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
    match layout {
        Layout::SideBySide | Layout::Vertical => {
            imageops::replace(
                &mut canvas,
                &before_fit,
                before_region.x as i64,
                before_region.y as i64,
            );
            imageops::replace(
                &mut canvas,
                &after_fit,
                after_region.x as i64,
                after_region.y as i64,
            );
        }
        Layout::Diagonal => {
            for (x, y, pixel) in canvas.enumerate_pixels_mut() {
                *pixel = if in_upper_right_triangle(x, y, width, height) {
                    *after_fit.get_pixel(x, y)
                } else {
                    *before_fit.get_pixel(x, y)
                };
            }
        }
    }

    if let Some(labels) = labels {
        draw_labels(&mut canvas, layout, labels);
    }
    canvas
}

/// Crop and scale `img` so it exactly covers `width`×`height`.
pub fn cover_fit(img: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    if width == 0 || height == 0 || img.width() == 0 || img.height() == 0 {
        return RgbaImage::new(width, height);
    }
    let crop = calculate_cover_crop((img.width(), img.height()), (width, height));
    let region = img.crop_imm(crop.x, crop.y, crop.width, crop.height);
    if (crop.width, crop.height) == (width, height) {
        region.to_rgba8()
    } else {
        region
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8()
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Pixel scale for caption glyphs on a canvas of this height.
pub fn label_scale(canvas_height: u32) -> u32 {
    (canvas_height / 150).clamp(1, 8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Before,
    After,
}

fn draw_labels(canvas: &mut RgbaImage, layout: Layout, labels: &Labels) {
    let scale = label_scale(canvas.height());
    for (slot, text) in [(Slot::Before, &labels.before), (Slot::After, &labels.after)] {
        if text.trim().is_empty() {
            continue;
        }
        let label = label_box(text, scale);
        let (x, y) = label_position(layout, slot, canvas.dimensions(), label, scale);
        draw_label(canvas, text, Rect::new(x, y, label.0, label.1), scale);
    }
}

/// Backdrop size for `text` at `scale`, padding included.
fn label_box(text: &str, scale: u32) -> (u32, u32) {
    let pad = 2 * scale;
    (
        glyphs::text_width(text) * scale + 2 * pad,
        GLYPH_HEIGHT * scale + 2 * pad,
    )
}

/// Top-left corner of a caption.
///
/// The before caption always sits at the canvas's top-left corner. Split
/// layouts put the after caption at the top-left of the after half; Diagonal
/// puts it top-right, inside the after triangle.
fn label_position(
    layout: Layout,
    slot: Slot,
    canvas: (u32, u32),
    label: (u32, u32),
    scale: u32,
) -> (u32, u32) {
    let margin = 4 * scale;
    let (width, height) = canvas;
    let (before, after) = layout_regions(layout, width, height);
    match (layout, slot) {
        (Layout::Diagonal, Slot::Before) => (margin, margin),
        (Layout::Diagonal, Slot::After) => (width.saturating_sub(label.0 + margin), margin),
        (_, Slot::Before) => (before.x + margin, before.y + margin),
        (_, Slot::After) => (after.x + margin, after.y + margin),
    }
}

fn draw_label(canvas: &mut RgbaImage, text: &str, area: Rect, scale: u32) {
    let (cw, ch) = canvas.dimensions();
    let x_end = (area.x + area.width).min(cw);
    let y_end = (area.y + area.height).min(ch);
    for y in area.y..y_end {
        for x in area.x..x_end {
            canvas.get_pixel_mut(x, y).blend(&LABEL_BACKDROP);
        }
    }

    let pad = 2 * scale;
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;
    for (i, c) in text.chars().enumerate() {
        let glyph = glyphs::glyph(c);
        let gx = area.x + pad + i as u32 * advance;
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !glyphs::is_set(&glyph, col, row) {
                    continue;
                }
                let px = gx + col * scale;
                let py = area.y + pad + row * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        if px + dx < x_end && py + dy < y_end {
                            canvas.put_pixel(px + dx, py + dy, LABEL_INK);
                        }
                    }
                }
            }
        }
    }
}
