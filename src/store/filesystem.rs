//! Filesystem-backed blob backend.
//!
//! Each key maps to a file under the base directory (`/` separated
//! segments become directories). Writes go to a temp file in the target
//! directory and are renamed into place, so readers never observe a
//! half-written object.

use super::backend::{BlobBackend, ObjectMeta, StorageError};
use super::keys::validate_key;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix of in-flight temp files; never listed as objects.
const TEMP_PREFIX: &str = ".tmp";

pub struct FilesystemBackend {
    base_dir: PathBuf,
}

impl FilesystemBackend {
    /// Creates the base directory if needed.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .map_err(|e| StorageError::io(&base_dir.display().to_string(), e))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.base_dir.clone(), |p, seg| p.join(seg)))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.base_dir).ok()?;
        let segments: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        Some(segments?.join("/"))
    }
}

impl BlobBackend for FilesystemBackend {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<ObjectMeta, StorageError> {
        let path = self.object_path(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::invalid_key(key, "key has no parent directory"))?;
        fs::create_dir_all(parent).map_err(|e| StorageError::io(key, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)
            .map_err(|e| StorageError::io(key, e))?;
        tmp.write_all(data).map_err(|e| StorageError::io(key, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(key, e))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::io(key, e.error))?;

        Ok(ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            modified_at: Utc::now(),
        })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    /// Object metadata from the filesystem; content type is guessed from the key.
    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        let path = self.object_path(key)?;
        let metadata = match fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(key, e)),
        };
        let content_type = mime_guess::from_path(&path).first().map_or_else(
            || "application/octet-stream".to_string(),
            |mime| mime.to_string(),
        );
        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(ObjectMeta {
            key: key.to_string(),
            size: metadata.len(),
            content_type,
            modified_at,
        }))
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                // Drop the per-photo directory once its last object is gone
                if let Some(parent) = path.parent() {
                    let _ = fs::remove_dir(parent);
                }
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Start the walk at the deepest directory the prefix names
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.base_dir.clone()
        } else {
            self.object_path(dir_part)?
        };
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&start) {
            let entry = entry.map_err(|e| {
                StorageError::io(prefix, io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(TEMP_PREFIX))
            {
                continue;
            }
            match self.key_for(entry.path()) {
                Some(key) if key.starts_with(prefix) => keys.push(key),
                _ => {}
            }
        }
        keys.sort();
        Ok(keys)
    }
}
