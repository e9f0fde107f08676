//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Display** | `apply_orientation` + Lanczos3 inside-fit → JPEG/AVIF |
//! | **Thumbnail** | center crop + Lanczos3 + `unsharpen` |
//! | **Composite** | cover-fit halves or diagonal mask + bitmap captions |
//!
//! EXIF fields are read in [`metadata`](crate::metadata) with `nom-exif`.
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
mod compose;
mod glyphs;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceInfo};
pub use operations::{RenderedImage, RenderedVariants, VariantSettings, render_variants};
pub use params::{
    CompositeParams, Labels, Orientation, OutputFormat, Quality, ResizeParams, Sharpening,
    ThumbnailParams,
};
pub use rust_backend::RustBackend;
