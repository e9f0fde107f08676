//! Object store adapter.
//!
//! Maps photo variants and composite renders onto a flat blob store and
//! hands back CDN-style addresses that say nothing about where the bytes
//! physically live.
//!
//! | Piece | Responsibility |
//! |---|---|
//! | [`keys`] | Collision-free key scheme, filename sanitizing, key validation |
//! | [`BlobBackend`] | Pluggable byte storage: [`MemoryBackend`], [`FilesystemBackend`] |
//! | [`presign`] | HMAC-signed, expiring download URLs |
//! | [`ObjectStore`] | Everything above combined: put/get, addresses, prefix sweeps |

mod backend;
mod filesystem;
pub mod keys;
mod memory;
pub mod presign;

pub use backend::{BlobBackend, ObjectMeta, StorageError};
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;

#[cfg(test)]
pub(crate) use backend::tests::FlakyBackend;

use crate::types::{PhotoId, ProjectId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Addressing and signing settings for an [`ObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Public prefix of every address, without trailing slash.
    pub public_base_url: String,
    pub signing_secret: String,
    pub presign_ttl_secs: u64,
    pub max_presign_ttl_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            public_base_url: "https://cdn.example.com".to_string(),
            signing_secret: "change-me".to_string(),
            presign_ttl_secs: 3600,
            max_presign_ttl_secs: 7 * 24 * 3600,
        }
    }
}

/// A persisted object: its key and its public address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub address: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub key: String,
    pub reason: String,
}

/// Outcome of a best-effort prefix sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted_keys: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Blob store plus key scheme, addresses and presigning.
///
/// Constructed once and passed by reference to the coordinators.
pub struct ObjectStore<B: BlobBackend> {
    backend: B,
    settings: StorageSettings,
}

impl<B: BlobBackend> ObjectStore<B> {
    pub fn new(backend: B, settings: StorageSettings) -> Self {
        let settings = StorageSettings {
            public_base_url: settings.public_base_url.trim_end_matches('/').to_string(),
            ..settings
        };
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Public retrieval address for a key.
    pub fn address(&self, key: &str) -> String {
        format!("{}/{key}", self.settings.public_base_url)
    }

    /// Persist bytes under `key`.
    pub fn put(
        &self,
        bytes: &[u8],
        key: &str,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        keys::validate_key(key)?;
        let meta = self.backend.put(key, bytes, content_type)?;
        debug!(key = %key, size = meta.size, content_type, "stored object");
        Ok(StoredObject {
            key: meta.key,
            address: self.address(key),
            size: meta.size,
        })
    }

    /// Read an object's bytes; a missing key is [`StorageError::NotFound`].
    pub fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        keys::validate_key(key)?;
        self.backend
            .get(key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    /// Size and content type of a stored object; a missing key is
    /// [`StorageError::NotFound`].
    pub fn head(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        keys::validate_key(key)?;
        self.backend
            .head(key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    pub fn delete(&self, key: &str) -> Result<bool, StorageError> {
        keys::validate_key(key)?;
        self.backend.delete(key)
    }

    /// Time-limited read address. `ttl_secs` defaults to the configured TTL
    /// and is clamped to `1..=max_presign_ttl_secs`.
    pub fn presigned_download(&self, key: &str, ttl_secs: Option<u64>) -> Result<String, StorageError> {
        self.presigned_download_at(key, ttl_secs, Utc::now())
    }

    pub fn presigned_download_at(
        &self,
        key: &str,
        ttl_secs: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        keys::validate_key(key)?;
        let ttl = ttl_secs
            .unwrap_or(self.settings.presign_ttl_secs)
            .clamp(1, self.settings.max_presign_ttl_secs.max(1));
        let expires = now.timestamp().saturating_add(ttl as i64);
        let signature = presign::sign(&self.settings.signing_secret, key, expires)?;
        Ok(format!(
            "{}?expires={expires}&signature={signature}",
            self.address(key)
        ))
    }

    /// Check a presigned URL produced by this store.
    pub fn verify_presigned(&self, url: &str) -> bool {
        self.verify_presigned_at(url, Utc::now())
    }

    pub fn verify_presigned_at(&self, url: &str, now: DateTime<Utc>) -> bool {
        match presign::parse_url(&self.settings.public_base_url, url) {
            Some((key, expires, signature)) => presign::verify(
                &self.settings.signing_secret,
                key,
                expires,
                signature,
                now.timestamp(),
            ),
            None => false,
        }
    }

    /// Remove every variant key of one photo.
    ///
    /// Best effort: a failing key is recorded and the sweep moves on.
    pub fn delete_by_prefix(&self, project: ProjectId, photo: PhotoId) -> DeleteReport {
        let mut report = DeleteReport::default();

        for prefix in keys::photo_prefixes(project, photo) {
            let listed = match self.backend.list(&prefix) {
                Ok(listed) => listed,
                Err(e) => {
                    warn!(prefix = %prefix, error = %e, "failed to list prefix");
                    report.errors.push(DeleteFailure {
                        key: prefix,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for key in listed {
                match self.backend.delete(&key) {
                    Ok(true) => {
                        debug!(key = %key, "deleted object");
                        report.deleted_keys.push(key);
                    }
                    // Already gone between list and delete
                    Ok(false) => {}
                    Err(e) => {
                        warn!(key = %key, error = %e, "failed to delete object");
                        report.errors.push(DeleteFailure {
                            key,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            photo_id = %photo,
            deleted = report.deleted_keys.len(),
            failed = report.errors.len(),
            "prefix sweep finished"
        );
        report
    }
}
