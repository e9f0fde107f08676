//! Capture metadata extraction.
//!
//! Every upload carries some facts in its container header (pixel size,
//! format) and, usually, an EXIF block written by the camera. Both are read
//! here and merged into one [`CaptureMetadata`] record.
//!
//! ## Sources
//!
//! - **Container header**: width, height and format, read through
//!   [`ImageBackend::identify`] without a full decode.
//! - **EXIF presence and orientation**: the raw EXIF chunk as the `image`
//!   decoder exposes it (JPEG APP1, PNG eXIf, WebP, TIFF), with orientation
//!   read by `image::metadata::Orientation::from_exif_chunk`.
//! - **EXIF fields** via `nom-exif`: camera make/model, capture time
//!   (`DateTimeOriginal`, falling back to `DateTime`), UTC offset
//!   (`OffsetTimeOriginal`), GPS latitude/longitude.
//!
//! ## Failure semantics
//!
//! Extraction never aborts the caller. The outcome is a [`MetadataReport`]
//! whose [`ExtractionStatus`] tells three cases apart:
//!
//! - `Extracted`: an EXIF block was found and parsed
//! - `Absent`: the file simply has no EXIF; every EXIF field is `None`
//! - `Failed`: a header or EXIF block exists but could not be read; the
//!   fields that could be salvaged are still filled in
//!
//! Whether an unreadable container is fatal is the ingestion coordinator's
//! decision, not this module's.

use crate::imaging::{ImageBackend, Orientation, SourceInfo};
use chrono::{DateTime, NaiveDateTime};
use image::metadata::Orientation as ImageOrientation;
use image::{ImageDecoder, ImageFormat, ImageReader};
use nom_exif::{EntryValue, Exif, ExifIter, ExifTag, LatLng, MediaParser, MediaSource};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

// Tags without a stable name across EXIF readers
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_OFFSET_TIME_ORIGINAL: u16 = 0x9011;

/// Capture facts for one photo. Every field is individually optional.
///
/// `width`/`height` are the stored raster size as the container reports it,
/// before orientation is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    /// Camera-local capture time.
    pub captured_at: Option<NaiveDateTime>,
    /// Offset of `captured_at` from UTC, when the camera recorded one.
    pub utc_offset_minutes: Option<i32>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    #[serde(default)]
    pub orientation: Orientation,
}

impl CaptureMetadata {
    /// True iff both coordinates are present.
    pub fn has_gps(&self) -> bool {
        self.gps_latitude.is_some() && self.gps_longitude.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExtractionStatus {
    Extracted,
    Absent,
    Failed { reason: String },
}

/// Outcome of [`extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataReport {
    pub metadata: CaptureMetadata,
    pub status: ExtractionStatus,
    /// Container facts, when the header was readable.
    pub source: Option<SourceInfo>,
}

/// Read container facts and EXIF from an in-memory upload.
pub fn extract(backend: &impl ImageBackend, bytes: &[u8]) -> MetadataReport {
    let mut metadata = CaptureMetadata::default();
    let mut failure = None;

    let source = match backend.identify(bytes) {
        Ok(info) => {
            metadata.width = Some(info.dimensions.width);
            metadata.height = Some(info.dimensions.height);
            metadata.format = Some(format_name(info.format).to_string());
            Some(info)
        }
        Err(e) => {
            failure = Some(format!("unreadable image header: {e}"));
            None
        }
    };

    let exif_status = match read_exif(bytes) {
        ExifOutcome::Found(exif) => {
            apply_exif(&mut metadata, exif);
            ExtractionStatus::Extracted
        }
        ExifOutcome::NotPresent => ExtractionStatus::Absent,
        ExifOutcome::Malformed(reason) => ExtractionStatus::Failed {
            reason: format!("malformed EXIF: {reason}"),
        },
    };

    // A header failure outranks whatever the EXIF pass found
    let status = match failure {
        Some(reason) => ExtractionStatus::Failed { reason },
        None => exif_status,
    };

    MetadataReport {
        metadata,
        status,
        source,
    }
}

/// Stable lowercase name of a container format.
pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Tiff => "tiff",
        ImageFormat::WebP => "webp",
        ImageFormat::Avif => "avif",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        _ => format.extensions_str().first().copied().unwrap_or("unknown"),
    }
}

/// EXIF fields as read, before normalization.
#[derive(Debug, Default)]
struct ExifFields {
    make: Option<String>,
    model: Option<String>,
    orientation: Orientation,
    date_time_original: Option<String>,
    date_time: Option<String>,
    offset_time_original: Option<String>,
    gps: Option<(f64, f64)>,
}

enum ExifOutcome {
    Found(ExifFields),
    NotPresent,
    Malformed(String),
}

/// Raw EXIF chunk carried by the container, if any.
///
/// Bytes no decoder recognizes have no container to carry EXIF in, so they
/// count as having none.
fn embedded_exif(bytes: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    if reader.format().is_none() {
        return Ok(None);
    }
    let mut decoder = reader.into_decoder().map_err(|e| e.to_string())?;
    decoder.exif_metadata().map_err(|e| e.to_string())
}

fn read_exif(bytes: &[u8]) -> ExifOutcome {
    let chunk = match embedded_exif(bytes) {
        Ok(Some(chunk)) => chunk,
        Ok(None) => return ExifOutcome::NotPresent,
        Err(reason) => return ExifOutcome::Malformed(reason),
    };
    let mut fields = ExifFields {
        orientation: ImageOrientation::from_exif_chunk(&chunk)
            .map(Orientation::from)
            .unwrap_or_default(),
        ..ExifFields::default()
    };

    let ms = match MediaSource::seekable(Cursor::new(bytes)) {
        Ok(ms) => ms,
        Err(e) => {
            // Container the field reader does not handle; orientation is all we get
            debug!(error = %e, "EXIF fields not readable in this container");
            return ExifOutcome::Found(fields);
        }
    };
    let mut parser = MediaParser::new();
    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => return ExifOutcome::Malformed(e.to_string()),
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    fields.gps = iter.parse_gps_info().ok().flatten().map(|gps| {
        (
            latlng_to_decimal(&gps.latitude, gps.latitude_ref),
            latlng_to_decimal(&gps.longitude, gps.longitude_ref),
        )
    });
    let exif: Exif = iter.into();

    fields.make = exif.get(ExifTag::Make).and_then(entry_text);
    fields.model = exif.get(ExifTag::Model).and_then(entry_text);
    fields.date_time_original = exif.get(ExifTag::DateTimeOriginal).and_then(entry_text);
    fields.date_time = exif
        .get_by_ifd_tag_code(0, TAG_DATE_TIME)
        .and_then(entry_text);
    fields.offset_time_original = exif
        .get_by_ifd_tag_code(0, TAG_OFFSET_TIME_ORIGINAL)
        .and_then(entry_text);
    ExifOutcome::Found(fields)
}

fn entry_text(value: &EntryValue) -> Option<String> {
    let s = value.to_string();
    let s = s.trim().trim_matches('"').trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Degrees, minutes, seconds rationals to signed decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let part = |num: f64, den: f64| if den == 0.0 { 0.0 } else { num / den };
    let degrees = part(latlng.0.0 as f64, latlng.0.1 as f64);
    let minutes = part(latlng.1.0 as f64, latlng.1.1 as f64);
    let seconds = part(latlng.2.0 as f64, latlng.2.1 as f64);

    let coord = degrees + minutes / 60.0 + seconds / 3600.0;
    if matches!(reference, 'S' | 's' | 'W' | 'w') {
        -coord
    } else {
        coord
    }
}

fn apply_exif(metadata: &mut CaptureMetadata, exif: ExifFields) {
    metadata.camera_make = exif.make;
    metadata.camera_model = exif.model;
    metadata.orientation = exif.orientation;
    metadata.captured_at = resolve(&[
        exif.date_time_original.as_deref(),
        exif.date_time.as_deref(),
    ])
    .and_then(|s| parse_exif_datetime(&s));
    metadata.utc_offset_minutes = exif
        .offset_time_original
        .as_deref()
        .and_then(parse_utc_offset);
    if let Some((lat, lon)) = exif.gps {
        metadata.gps_latitude = Some(lat);
        metadata.gps_longitude = Some(lon);
    }
}

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value.
///
/// ```text
/// captured_at: resolve(&[date_time_original, date_time])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Camera-local capture time from an EXIF date string.
///
/// Accepts the raw `YYYY:MM:DD HH:MM:SS` form as well as the normalized
/// forms an EXIF reader may return (RFC 3339, ISO 8601 with or without an
/// offset). An offset, if present, is dropped: the local wall-clock time is
/// kept. Placeholder zero dates yield `None`.
pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.naive_local());
    }
    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parse an EXIF offset string (`+02:00`, `-05:30`) into minutes.
pub fn parse_utc_offset(value: &str) -> Option<i32> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) || hours > 14 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}
