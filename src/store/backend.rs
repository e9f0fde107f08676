//! Blob backend trait for the object store.
//!
//! A backend is a flat key → bytes map with prefix listing. Everything
//! above it (key scheme, addresses, presigning, sweeps) lives in
//! [`ObjectStore`](super::ObjectStore), so any bucket/key store can sit
//! behind this trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage backend failure on {key}: {reason}")]
    Backend { key: String, reason: String },
    #[error("presign failed: {0}")]
    Presign(String),
}

impl StorageError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// Metadata for a stored object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// MIME content type (e.g., "image/jpeg")
    pub content_type: String,
    pub modified_at: DateTime<Utc>,
}

/// Backend trait for object storage.
///
/// All backends must be thread-safe (`Send + Sync`); concurrent requests
/// share one store. Keys arrive already validated by the caller but
/// backends validate again before touching anything physical.
pub trait BlobBackend: Send + Sync {
    /// Stores an object, replacing any previous bytes under `key`.
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<ObjectMeta, StorageError>;

    /// Retrieves an object's bytes; `Ok(None)` when absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Object metadata without the bytes; `Ok(None)` when absent.
    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError>;

    /// Deletes an object. `Ok(true)` if it existed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Lists keys starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
