//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with guessed format |
//! | Truncation check (JPEG) | marker walk to EOI before decoding |
//! | Orientation | `image::DynamicImage::apply_orientation` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Thumbnail crop | [`compose::cover_fit`](super::compose::cover_fit): center crop, then `Lanczos3` |
//! | Sharpening | `image::imageops::unsharpen` |
//! | Composite | [`compose`](super::compose) on RGBA canvases |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, Dimensions, ImageBackend, SourceInfo};
use super::compose;
use super::params::{
    CompositeParams, Orientation, OutputFormat, Quality, ResizeParams, ThumbnailParams,
};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(source: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Decode an in-memory image.
///
/// The JPEG decoder conceals missing scan data, so a truncated upload would
/// decode into a partly grey picture. JPEG streams must therefore reach
/// their end-of-image marker before they are decoded at all.
fn load_image(source: &[u8]) -> Result<DynamicImage, BackendError> {
    let reader = reader(source)?;
    if reader.format() == Some(ImageFormat::Jpeg) && !jpeg_is_complete(source) {
        return Err(BackendError::Decode(
            "JPEG stream ends before its end-of-image marker".to_string(),
        ));
    }
    reader
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Decode and turn upright.
fn load_upright(source: &[u8], orientation: Orientation) -> Result<DynamicImage, BackendError> {
    let mut img = load_image(source)?;
    img.apply_orientation(orientation.into());
    Ok(img)
}

/// Whether a JPEG stream runs through to the EOI marker of its main image.
///
/// Walks marker segments from SOI by their declared lengths and skips the
/// entropy-coded data after each SOS. An EOI inside an APP segment (the
/// EXIF thumbnail) is therefore never mistaken for the end of the image.
/// Bytes after the final EOI are allowed.
fn jpeg_is_complete(data: &[u8]) -> bool {
    if data.len() < 4 || data[0] != MARKER || data[1] != SOI {
        return false;
    }
    let mut pos = 2;
    loop {
        if data.get(pos) != Some(&MARKER) {
            return false;
        }
        // Any number of fill bytes may precede a marker
        while data.get(pos + 1) == Some(&MARKER) {
            pos += 1;
        }
        let Some(&marker) = data.get(pos + 1) else {
            return false;
        };
        match marker {
            EOI => return true,
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => pos += 2,
            _ => {
                let Some(len) = data.get(pos + 2..pos + 4) else {
                    return false;
                };
                pos += 2 + u16::from_be_bytes([len[0], len[1]]) as usize;
                if pos > data.len() {
                    return false;
                }
                if marker == SOS {
                    match skip_scan(data, pos) {
                        Some(next) => pos = next,
                        None => return false,
                    }
                }
            }
        }
    }
}

/// Offset of the first marker after entropy-coded data starting at `pos`.
fn skip_scan(data: &[u8], mut pos: usize) -> Option<usize> {
    while pos + 1 < data.len() {
        if data[pos] != MARKER {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            // Stuffed zero byte or restart marker: still inside the scan
            0x00 | 0xD0..=0xD7 => pos += 2,
            MARKER => pos += 1,
            _ => return Some(pos),
        }
    }
    None
}

/// Encode to the requested format. Alpha is dropped; every output is opaque.
fn encode(img: &DynamicImage, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let q = quality.value() as u8;
    let mut out = Vec::new();

    let result = match format {
        OutputFormat::Jpeg => rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, q)),
        // speed=6 for reasonable throughput
        OutputFormat::Avif => {
            rgb.write_with_encoder(AvifEncoder::new_with_speed_quality(&mut out, 6, q))
        }
    };
    result.map_err(|e| BackendError::Encode(format!("{format:?} encode failed: {e}")))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<SourceInfo, BackendError> {
        let reader = reader(source)?;
        let format = reader
            .format()
            .ok_or_else(|| BackendError::Decode("unrecognized image format".to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(SourceInfo {
            dimensions: Dimensions { width, height },
            format,
        })
    }

    fn resize(&self, params: &ResizeParams<'_>) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid resize target {}x{}",
                params.width, params.height
            )));
        }
        let img = load_upright(params.source, params.orientation)?;
        let resized = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode(&resized, params.format, params.quality)
    }

    fn thumbnail(&self, params: &ThumbnailParams<'_>) -> Result<Vec<u8>, BackendError> {
        if params.crop_width == 0 || params.crop_height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid thumbnail size {}x{}",
                params.crop_width, params.crop_height
            )));
        }
        let img = load_upright(params.source, params.orientation)?;

        // Center-crop to the target aspect, then scale to exact dimensions
        let filled = DynamicImage::ImageRgba8(compose::cover_fit(
            &img,
            params.crop_width,
            params.crop_height,
        ));

        // Apply sharpening if requested
        let final_img = if let Some(sharpening) = params.sharpening {
            DynamicImage::from(image::imageops::unsharpen(
                &filled,
                sharpening.sigma,
                sharpening.threshold,
            ))
        } else {
            filled
        };

        encode(&final_img, params.format, params.quality)
    }

    fn composite(&self, params: &CompositeParams<'_>) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid canvas {}x{}",
                params.width, params.height
            )));
        }
        let before = load_image(params.before)?;
        let after = load_image(params.after)?;
        let canvas = compose::compose(
            &before,
            &after,
            params.layout,
            (params.width, params.height),
            params.labels.as_ref(),
        );
        encode(
            &DynamicImage::ImageRgba8(canvas),
            params.format,
            params.quality,
        )
    }
}
