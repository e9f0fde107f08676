//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what images to create) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters (sigma + threshold) for thumbnail crispness.
//! - [`OutputFormat`]: Encoder used for derived variants and composites.
//! - [`Orientation`]: EXIF orientation applied before resizing.
//! - [`ResizeParams`]: Inside-fit resize of a source buffer to exact output dimensions.
//! - [`ThumbnailParams`]: Cover resize + center crop to exact dimensions.
//! - [`CompositeParams`]: Two sources combined onto one canvas per [`Layout`].

use crate::types::Layout;
use image::metadata::Orientation as ImageOrientation;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening suitable for thumbnails.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Encoder for derived images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Avif,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Avif => "image/avif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Avif => "avif",
        }
    }
}

/// EXIF orientation (tag 0x0112), stored with the photo record.
///
/// Mirrors [`image::metadata::Orientation`], which does the reading and the
/// pixel transforms; this copy exists so the value can be serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl From<ImageOrientation> for Orientation {
    fn from(value: ImageOrientation) -> Self {
        match value {
            ImageOrientation::NoTransforms => Self::Normal,
            ImageOrientation::FlipHorizontal => Self::FlipHorizontal,
            ImageOrientation::Rotate180 => Self::Rotate180,
            ImageOrientation::FlipVertical => Self::FlipVertical,
            ImageOrientation::Rotate90FlipH => Self::Transpose,
            ImageOrientation::Rotate90 => Self::Rotate90,
            ImageOrientation::Rotate270FlipH => Self::Transverse,
            ImageOrientation::Rotate270 => Self::Rotate270,
        }
    }
}

impl From<Orientation> for ImageOrientation {
    fn from(value: Orientation) -> Self {
        match value {
            Orientation::Normal => Self::NoTransforms,
            Orientation::FlipHorizontal => Self::FlipHorizontal,
            Orientation::Rotate180 => Self::Rotate180,
            Orientation::FlipVertical => Self::FlipVertical,
            Orientation::Transpose => Self::Rotate90FlipH,
            Orientation::Rotate90 => Self::Rotate90,
            Orientation::Transverse => Self::Rotate270FlipH,
            Orientation::Rotate270 => Self::Rotate270,
        }
    }
}

impl Orientation {
    /// Whether width and height trade places once applied.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    /// Upright dimensions of a raster stored with this orientation.
    pub fn upright(self, dims: (u32, u32)) -> (u32, u32) {
        if self.swaps_dimensions() {
            (dims.1, dims.0)
        } else {
            dims
        }
    }
}

/// Parameters for an inside-fit resize. `width`/`height` are the final
/// upright dimensions, already computed by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams<'a> {
    pub source: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for a thumbnail operation (resize + center crop).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams<'a> {
    pub source: &'a [u8],
    /// Final crop dimensions.
    pub crop_width: u32,
    pub crop_height: u32,
    pub orientation: Orientation,
    pub format: OutputFormat,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

/// Caption pair drawn over a composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub before: String,
    pub after: String,
}

/// Parameters for a before/after composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeParams<'a> {
    pub before: &'a [u8],
    pub after: &'a [u8],
    pub layout: Layout,
    pub width: u32,
    pub height: u32,
    pub labels: Option<Labels>,
    pub format: OutputFormat,
    pub quality: Quality,
}
