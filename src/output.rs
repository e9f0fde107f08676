//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not key-centric**. Each photo leads with
//! its positional index and original filename; storage addresses and
//! capture facts follow as indented context lines. Keys are never printed,
//! only the public addresses returned to callers.
//!
//! # Output Format
//!
//! ## Ingest
//!
//! ```text
//! Ingested 2 of 3 photos
//! 001 roof.jpg (4000x3000)
//!     Id: 5f0c...
//!     Display: https://cdn.example.com/.../roof.jpg (2048x1536)
//!     Thumbnail: https://cdn.example.com/.../roof.jpg (400x400)
//!     Captured: 2024-05-17 14:03:22, Canon EOS R5
//!     GPS: 40.44611, -79.98222
//! 002 gutter.png (1200x800)
//!     ...
//!
//! Failed
//! 003 bad.jpg: unreadable image
//! ```
//!
//! ## Composite
//!
//! ```text
//! Composite side_by_side 2400x1200
//!     https://cdn.example.com/projects/.../composites/.../....jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::composite::CompositeOutcome;
use crate::ingest::BatchReport;
use crate::store::{DeleteReport, ObjectMeta};
use crate::types::Photo;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

// ============================================================================
// Ingest
// ============================================================================

/// Format one cataloged photo.
///
/// ```text
/// 001 roof.jpg (4000x3000)
///     Id: ...
///     Display: <address> (2048x1536)
/// ```
pub fn format_photo(index: usize, photo: &Photo) -> Vec<String> {
    let ctx = indent(1);
    let mut lines = vec![format!(
        "{} {} ({}x{})",
        format_index(index),
        photo.original_filename,
        photo.width,
        photo.height
    )];
    lines.push(format!("{ctx}Id: {}", photo.id));

    let display = &photo.variants.display;
    let thumbnail = &photo.variants.thumbnail;
    lines.push(format!(
        "{ctx}Display: {} ({}x{})",
        display.address, display.width, display.height
    ));
    lines.push(format!(
        "{ctx}Thumbnail: {} ({}x{})",
        thumbnail.address, thumbnail.width, thumbnail.height
    ));

    let meta = &photo.metadata;
    let camera: Vec<&str> = [meta.camera_make.as_deref(), meta.camera_model.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    match (meta.captured_at, camera.is_empty()) {
        (Some(at), true) => lines.push(format!("{ctx}Captured: {at}")),
        (Some(at), false) => lines.push(format!("{ctx}Captured: {at}, {}", camera.join(" "))),
        (None, false) => lines.push(format!("{ctx}Camera: {}", camera.join(" "))),
        (None, true) => {}
    }

    if let (Some(lat), Some(lon)) = (meta.gps_latitude, meta.gps_longitude) {
        lines.push(format!("{ctx}GPS: {lat:.5}, {lon:.5}"));
    }
    if let Some(caption) = &photo.caption {
        lines.push(format!("{ctx}Caption: {}", truncate_desc(caption, 60)));
    }
    if !photo.tags.is_empty() {
        lines.push(format!("{ctx}Tags: {}", photo.tags.join(", ")));
    }
    lines
}

/// Format a batch result: successes first, then failures, each in
/// submission order.
pub fn format_ingest_report(report: &BatchReport) -> Vec<String> {
    let total = report.succeeded.len() + report.failed.len();
    let mut lines = vec![format!(
        "Ingested {} of {} photos",
        report.succeeded.len(),
        total
    )];

    for (i, photo) in report.succeeded.iter().enumerate() {
        lines.extend(format_photo(i + 1, photo));
    }

    if !report.failed.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for (i, failure) in report.failed.iter().enumerate() {
            lines.push(format!(
                "{} {}: {}",
                format_index(i + 1),
                failure.filename,
                failure.reason
            ));
        }
    }
    lines
}

pub fn print_ingest_report(report: &BatchReport) {
    for line in format_ingest_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Composite
// ============================================================================

pub fn format_composite(outcome: &CompositeOutcome) -> Vec<String> {
    vec![
        format!(
            "Composite {} {}x{}",
            outcome.layout, outcome.width, outcome.height
        ),
        format!("{}{}", indent(1), outcome.address),
    ]
}

pub fn print_composite(outcome: &CompositeOutcome) {
    for line in format_composite(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Delete
// ============================================================================

/// Deleted keys are summarized by count; failures list the key, since the
/// operator needs it to clean up by hand.
pub fn format_delete_report(report: &DeleteReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Deleted {} objects, {} failed",
        report.deleted_keys.len(),
        report.errors.len()
    )];
    for failure in &report.errors {
        lines.push(format!("{}{}: {}", indent(1), failure.key, failure.reason));
    }
    lines
}

pub fn print_delete_report(report: &DeleteReport) {
    for line in format_delete_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Presign
// ============================================================================

/// The URL on its own line so it can be piped; object facts follow.
pub fn format_presigned(url: &str, ttl_secs: u64, meta: &ObjectMeta) -> Vec<String> {
    vec![
        url.to_string(),
        format!("{}{}, {} bytes", indent(1), meta.content_type, meta.size),
        format!("{}valid for {}s", indent(1), ttl_secs),
    ]
}

pub fn print_presigned(url: &str, ttl_secs: u64, meta: &ObjectMeta) {
    for line in format_presigned(url, ttl_secs, meta) {
        println!("{}", line);
    }
}
