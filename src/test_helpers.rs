//! Shared test utilities for the photoforge test suite.
//!
//! Provides synthetic image encoders, a hand-built EXIF writer, and store
//! and catalog fixtures that the unit tests across modules share.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fixture = ExifFixture {
//!     make: Some("Canon".into()),
//!     gps: Some(((40, 26, 46.0), 'N', (79, 58, 56.0), 'W')),
//!     ..ExifFixture::default()
//! };
//! let bytes = jpeg_with_exif(4000, 3000, &fixture);
//! let store = memory_store();
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::metadata::CaptureMetadata;
use crate::store::{BlobBackend, MemoryBackend, ObjectStore, StorageSettings, keys};
use crate::types::{
    Photo, PhotoId, PhotoKind, PhotoVariants, ProjectId, VariantClass, VariantRecord,
};
use chrono::Utc;

// =========================================================================
// Synthetic images
// =========================================================================

fn encode_jpeg(img: &RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A valid gradient JPEG with the given dimensions.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    encode_jpeg(&img)
}

/// A single-colour JPEG, for asserting which source a canvas region came from.
pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_jpeg(&RgbImage::from_pixel(width, height, image::Rgb(rgb)))
}

/// A valid gradient PNG with the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(y % 256) as u8, 64, (x % 256) as u8])
    });
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

// =========================================================================
// EXIF writer
// =========================================================================

/// Fields to write into a synthetic EXIF block.
#[derive(Debug, Clone, Default)]
pub struct ExifFixture {
    pub make: Option<String>,
    pub model: Option<String>,
    pub orientation: Option<u16>,
    pub date_time: Option<String>,
    pub date_time_original: Option<String>,
    pub offset_time_original: Option<String>,
    /// `((deg, min, sec), lat_ref, (deg, min, sec), lon_ref)`
    pub gps: Option<((u32, u32, f64), char, (u32, u32, f64), char)>,
}

#[derive(Clone)]
enum TagValue {
    Ascii(String),
    Short(u16),
    Long(u32),
    Rationals(Vec<(u32, u32)>),
}

fn put_u16(buf: &mut Vec<u8>, v: u16, big_endian: bool) {
    buf.extend_from_slice(&if big_endian {
        v.to_be_bytes()
    } else {
        v.to_le_bytes()
    });
}

fn put_u32(buf: &mut Vec<u8>, v: u32, big_endian: bool) {
    buf.extend_from_slice(&if big_endian {
        v.to_be_bytes()
    } else {
        v.to_le_bytes()
    });
}

/// Encode one IFD (entry table + its out-of-line data) placed at `start`.
fn encode_ifd(entries: &[(u16, TagValue)], start: u32, big_endian: bool) -> Vec<u8> {
    let n = entries.len() as u32;
    let data_start = start + 2 + 12 * n + 4;
    let mut table = Vec::new();
    let mut data = Vec::new();

    put_u16(&mut table, n as u16, big_endian);
    for (tag, value) in entries {
        let mut bytes = Vec::new();
        let (typ, count) = match value {
            TagValue::Ascii(s) => {
                bytes.extend_from_slice(s.as_bytes());
                bytes.push(0);
                (2u16, bytes.len() as u32)
            }
            TagValue::Short(v) => {
                put_u16(&mut bytes, *v, big_endian);
                (3, 1)
            }
            TagValue::Long(v) => {
                put_u32(&mut bytes, *v, big_endian);
                (4, 1)
            }
            TagValue::Rationals(rs) => {
                for (num, den) in rs {
                    put_u32(&mut bytes, *num, big_endian);
                    put_u32(&mut bytes, *den, big_endian);
                }
                (5, rs.len() as u32)
            }
        };

        put_u16(&mut table, *tag, big_endian);
        put_u16(&mut table, typ, big_endian);
        put_u32(&mut table, count, big_endian);
        if bytes.len() <= 4 {
            bytes.resize(4, 0);
            table.extend_from_slice(&bytes);
        } else {
            put_u32(&mut table, data_start + data.len() as u32, big_endian);
            data.extend_from_slice(&bytes);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    put_u32(&mut table, 0, big_endian);
    table.extend_from_slice(&data);
    table
}

fn dms(value: (u32, u32, f64)) -> Vec<(u32, u32)> {
    vec![
        (value.0, 1),
        (value.1, 1),
        ((value.2 * 100.0).round() as u32, 100),
    ]
}

/// Build a TIFF structure carrying the fixture's fields.
pub fn tiff_block(fixture: &ExifFixture, big_endian: bool) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    if let Some(make) = &fixture.make {
        ifd0.push((0x010F, TagValue::Ascii(make.clone())));
    }
    if let Some(model) = &fixture.model {
        ifd0.push((0x0110, TagValue::Ascii(model.clone())));
    }
    if let Some(orientation) = fixture.orientation {
        ifd0.push((0x0112, TagValue::Short(orientation)));
    }
    if let Some(dt) = &fixture.date_time {
        ifd0.push((0x0132, TagValue::Ascii(dt.clone())));
    }

    let mut exif = Vec::new();
    if let Some(dt) = &fixture.date_time_original {
        exif.push((0x9003, TagValue::Ascii(dt.clone())));
    }
    if let Some(offset) = &fixture.offset_time_original {
        exif.push((0x9011, TagValue::Ascii(offset.clone())));
    }

    let mut gps = Vec::new();
    if let Some((lat, lat_ref, lon, lon_ref)) = fixture.gps {
        gps.push((0x0001, TagValue::Ascii(lat_ref.to_string())));
        gps.push((0x0002, TagValue::Rationals(dms(lat))));
        gps.push((0x0003, TagValue::Ascii(lon_ref.to_string())));
        gps.push((0x0004, TagValue::Rationals(dms(lon))));
    }

    // Pointers are inline LONGs, so IFD0's size doesn't depend on their values
    let ifd0_with_pointers = |exif_at: u32, gps_at: u32| {
        let mut entries = ifd0.clone();
        if !exif.is_empty() {
            entries.push((0x8769, TagValue::Long(exif_at)));
        }
        if !gps.is_empty() {
            entries.push((0x8825, TagValue::Long(gps_at)));
        }
        entries
    };
    let ifd0_len = encode_ifd(&ifd0_with_pointers(0, 0), 8, big_endian).len() as u32;
    let exif_offset = 8 + ifd0_len;
    let exif_bytes = if exif.is_empty() {
        Vec::new()
    } else {
        encode_ifd(&exif, exif_offset, big_endian)
    };
    let gps_offset = exif_offset + exif_bytes.len() as u32;
    let gps_bytes = if gps.is_empty() {
        Vec::new()
    } else {
        encode_ifd(&gps, gps_offset, big_endian)
    };

    let mut out = Vec::new();
    if big_endian {
        out.extend_from_slice(b"MM");
    } else {
        out.extend_from_slice(b"II");
    }
    put_u16(&mut out, 42, big_endian);
    put_u32(&mut out, 8, big_endian);
    out.extend_from_slice(&encode_ifd(
        &ifd0_with_pointers(exif_offset, gps_offset),
        8,
        big_endian,
    ));
    out.extend_from_slice(&exif_bytes);
    out.extend_from_slice(&gps_bytes);
    out
}

/// A gradient JPEG with an APP1 Exif segment right after SOI.
pub fn jpeg_with_exif(width: u32, height: u32, fixture: &ExifFixture) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff_block(fixture, true));

    let seg_len = (payload.len() + 2) as u16;
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Store fixtures
// =========================================================================

/// Settings with a fixed secret so presigned URLs are reproducible.
pub fn test_storage_settings() -> StorageSettings {
    StorageSettings {
        public_base_url: "https://cdn.test".to_string(),
        signing_secret: "test-secret".to_string(),
        presign_ttl_secs: 3600,
        max_presign_ttl_secs: 86_400,
    }
}

/// An object store over a fresh in-memory backend.
pub fn memory_store() -> ObjectStore<MemoryBackend> {
    ObjectStore::new(MemoryBackend::new(), test_storage_settings())
}

// =========================================================================
// Catalog fixtures
// =========================================================================

/// Store all three variants of a new photo and return its catalog record.
///
/// Every variant holds `display_bytes`; only the display key is read by the
/// composite path.
pub fn catalog_photo<B: BlobBackend>(
    store: &ObjectStore<B>,
    project: ProjectId,
    display_bytes: &[u8],
) -> Photo {
    let id = PhotoId::new();
    let record = |class: VariantClass| {
        let key = keys::variant_key(project, class, id, "fixture.jpg");
        let stored = store.put(display_bytes, &key, "image/jpeg").unwrap();
        VariantRecord {
            key: stored.key,
            address: stored.address,
            content_type: "image/jpeg".to_string(),
            width: 100,
            height: 100,
            byte_size: stored.size,
            checksum: String::new(),
        }
    };

    Photo {
        id,
        project_id: project,
        owner_id: "tester".to_string(),
        original_filename: "fixture.jpg".to_string(),
        variants: PhotoVariants {
            original: record(VariantClass::Original),
            display: record(VariantClass::Display),
            thumbnail: record(VariantClass::Thumbnail),
        },
        width: 100,
        height: 100,
        metadata: CaptureMetadata::default(),
        has_gps: false,
        kind: PhotoKind::General,
        caption: None,
        tags: Vec::new(),
        created_at: Utc::now(),
        deleted_at: None,
    }
}
