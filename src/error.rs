//! Coarse error classification shared by the ingestion and composite paths.
//!
//! Each component owns a detailed error enum. Callers that only need to
//! decide how to respond (reject the request, report a bad file, retry later)
//! use [`ErrorKind`] instead of matching on component internals.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Terminal classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input rejected before any processing.
    Validation,
    /// Source bytes could not be decoded as an image.
    UnreadableImage,
    /// The durable store failed to read or write.
    Storage,
    /// Composite rendering failed after validation passed.
    Render,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation error",
            Self::UnreadableImage => "unreadable image",
            Self::Storage => "storage error",
            Self::Render => "render error",
        };
        f.write_str(name)
    }
}

/// Input rejected at a component boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);
