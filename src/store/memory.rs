//! In-memory blob backend.
//!
//! Fast, non-persistent storage using DashMap for concurrent access. Used
//! by the test suite and by embedders that hand bytes elsewhere.

use super::backend::{BlobBackend, ObjectMeta, StorageError};
use super::keys::validate_key;
use chrono::Utc;
use dashmap::DashMap;

#[derive(Clone)]
struct MemoryObject {
    data: Vec<u8>,
    meta: ObjectMeta,
}

/// In-memory object storage backend using DashMap.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct MemoryBackend {
    data: DashMap<String, MemoryObject>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl BlobBackend for MemoryBackend {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<ObjectMeta, StorageError> {
        validate_key(key)?;
        let meta = ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            modified_at: Utc::now(),
        };
        self.data.insert(
            key.to_string(),
            MemoryObject {
                data: data.to_vec(),
                meta: meta.clone(),
            },
        );
        Ok(meta)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        Ok(self.data.get(key).map(|obj| obj.data.clone()))
    }

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        validate_key(key)?;
        Ok(self.data.get(key).map(|obj| obj.meta.clone()))
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.data.remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .data
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
