//! Object key scheme.
//!
//! ```text
//! projects/{projectId}/originals/{photoId}/{filename}
//! projects/{projectId}/display/{photoId}/{filename}
//! projects/{projectId}/thumbnails/{photoId}/{filename}
//! projects/{projectId}/composites/{comparisonId}/{renderId}.{ext}
//! ```
//!
//! Every photo key sits under a directory named by the photo's own UUID,
//! and every prefix used for sweeping ends in `/`. Two distinct photos can
//! therefore never share a prefix, whatever their filenames or bytes.

use super::backend::StorageError;
use crate::types::{ComparisonId, PhotoId, ProjectId, VariantClass};
use uuid::Uuid;

const MAX_FILENAME_LEN: usize = 100;
const MAX_KEY_LEN: usize = 1024;
const FALLBACK_FILENAME: &str = "photo";

/// Directory holding one variant of one photo, with trailing slash.
pub fn variant_prefix(project: ProjectId, class: VariantClass, photo: PhotoId) -> String {
    format!("projects/{project}/{}/{photo}/", class.namespace())
}

/// Key for one variant of one photo. `filename` must already be sanitized.
pub fn variant_key(
    project: ProjectId,
    class: VariantClass,
    photo: PhotoId,
    filename: &str,
) -> String {
    format!("{}{filename}", variant_prefix(project, class, photo))
}

/// All three variant prefixes of a photo.
pub fn photo_prefixes(project: ProjectId, photo: PhotoId) -> [String; 3] {
    VariantClass::ALL.map(|class| variant_prefix(project, class, photo))
}

/// Key for one composite render.
pub fn composite_key(
    project: ProjectId,
    comparison: ComparisonId,
    render: Uuid,
    extension: &str,
) -> String {
    format!("projects/{project}/composites/{comparison}/{render}.{extension}")
}

/// Sanitize an upload filename for use as the last key segment.
///
/// - Drops any directory part (`/` or `\` separated)
/// - Replaces everything except ASCII alphanumerics, `-`, `_`, `.` with `-`
/// - Collapses runs of `-` and strips leading/trailing `-` and `.`
/// - Truncates to 100 characters, keeping the extension
/// - Falls back to `photo` when nothing survives
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    // Collapse consecutive dashes
    let mut collapsed = String::with_capacity(mapped.len());
    let mut prev_dash = false;
    for c in mapped.chars() {
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    if trimmed.len() <= MAX_FILENAME_LEN {
        return trimmed.to_string();
    }

    // Keep the extension, shorten the stem (all ASCII, so byte slicing is safe)
    match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < 16 => {
            let keep = MAX_FILENAME_LEN - ext.len() - 1;
            format!("{}.{ext}", &stem[..keep.min(stem.len())])
        }
        _ => trimmed[..MAX_FILENAME_LEN].to_string(),
    }
}

/// Replace the extension of a sanitized filename (`IMG_1.HEIC` → `IMG_1.jpg`).
pub fn with_extension(filename: &str, extension: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    format!("{stem}.{extension}")
}

/// Validate an object key before it reaches a backend.
///
/// Rejects keys that are empty, absolute, over-long, contain backslashes,
/// or have empty, `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::invalid_key(key, "key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::invalid_key(key, "key too long"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(key, "key cannot be absolute"));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(StorageError::invalid_key(key, "key contains a forbidden character"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(StorageError::invalid_key(key, "key has an empty segment")),
            "." | ".." => {
                return Err(StorageError::invalid_key(key, "key cannot contain '.' or '..'"));
            }
            _ => {}
        }
    }
    Ok(())
}
