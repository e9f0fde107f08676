//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: identify, resize, thumbnail, and composite. All of them work on
//! in-memory buffers: uploads arrive as bytes and results go straight to the
//! object store, so nothing touches a local path.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, zero
//! external dependencies. Everything is statically linked into the binary.

use super::params::{CompositeParams, ResizeParams, ThumbnailParams};
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Container-level facts about a source buffer, read without a full decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub dimensions: Dimensions,
    pub format: ImageFormat,
}

impl SourceInfo {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all four operations so the rest of the
/// codebase is backend-agnostic. Each call either returns the complete
/// encoded output or an error; there are no partial results.
pub trait ImageBackend: Sync {
    /// Read format and raw (pre-orientation) dimensions.
    fn identify(&self, source: &[u8]) -> Result<SourceInfo, BackendError>;

    /// Inside-fit resize to the exact dimensions in `params`.
    fn resize(&self, params: &ResizeParams<'_>) -> Result<Vec<u8>, BackendError>;

    /// Execute a thumbnail operation (resize + center crop).
    fn thumbnail(&self, params: &ThumbnailParams<'_>) -> Result<Vec<u8>, BackendError>;

    /// Combine two sources onto one canvas.
    fn composite(&self, params: &CompositeParams<'_>) -> Result<Vec<u8>, BackendError>;
}
