//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.
//!
//! The variant renderer turns one upload into its derived set:
//! - **display**: inside-fit to `display_max_edge`, never upscaled
//! - **thumbnail**: cover-fit + center crop to an exact square
//!
//! The original is never re-encoded, so it does not pass through here.

use super::backend::{BackendError, ImageBackend, SourceInfo};
use super::calculations::calculate_fit_inside;
use super::params::{
    Orientation, OutputFormat, Quality, ResizeParams, Sharpening, ThumbnailParams,
};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for derived variants.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSettings {
    pub display_max_edge: u32,
    pub display_quality: Quality,
    pub thumbnail_size: u32,
    pub thumbnail_quality: Quality,
    pub thumbnail_sharpening: Option<Sharpening>,
    pub format: OutputFormat,
}

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            display_max_edge: 2048,
            display_quality: Quality::new(85),
            thumbnail_size: 400,
            thumbnail_quality: Quality::new(80),
            thumbnail_sharpening: Some(Sharpening::light()),
            format: OutputFormat::Jpeg,
        }
    }
}

/// One encoded derived image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
}

/// Display and thumbnail for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVariants {
    pub display: RenderedImage,
    pub thumbnail: RenderedImage,
}

/// Plan the display resize without executing it.
///
/// `info` carries raw (stored) dimensions; the plan targets the upright size.
pub fn plan_display<'a>(
    source: &'a [u8],
    info: &SourceInfo,
    orientation: Orientation,
    settings: &VariantSettings,
) -> ResizeParams<'a> {
    let upright = orientation.upright((info.dimensions.width, info.dimensions.height));
    let (width, height) = calculate_fit_inside(upright, settings.display_max_edge);

    ResizeParams {
        source,
        width,
        height,
        orientation,
        format: settings.format,
        quality: settings.display_quality,
    }
}

/// Plan a thumbnail operation without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_thumbnail<'a>(
    source: &'a [u8],
    orientation: Orientation,
    settings: &VariantSettings,
) -> ThumbnailParams<'a> {
    ThumbnailParams {
        source,
        crop_width: settings.thumbnail_size,
        crop_height: settings.thumbnail_size,
        orientation,
        format: settings.format,
        quality: settings.thumbnail_quality,
        sharpening: settings.thumbnail_sharpening,
    }
}

/// Render display and thumbnail variants.
///
/// Either both variants come back or an error does; callers never see a
/// partial set.
pub fn render_variants(
    backend: &impl ImageBackend,
    source: &[u8],
    info: &SourceInfo,
    orientation: Orientation,
    settings: &VariantSettings,
) -> Result<RenderedVariants> {
    let display_params = plan_display(source, info, orientation, settings);
    let display = RenderedImage {
        bytes: backend.resize(&display_params)?,
        width: display_params.width,
        height: display_params.height,
        content_type: display_params.format.content_type(),
    };

    let thumb_params = plan_thumbnail(source, orientation, settings);
    let thumbnail = RenderedImage {
        bytes: backend.thumbnail(&thumb_params)?,
        width: thumb_params.crop_width,
        height: thumb_params.crop_height,
        content_type: thumb_params.format.content_type(),
    };

    Ok(RenderedVariants { display, thumbnail })
}
