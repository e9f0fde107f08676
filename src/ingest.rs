//! Photo ingestion.
//!
//! Turns one upload into a cataloged [`Photo`] with all three variants
//! persisted, or into a single coarse error with nothing left behind.
//!
//! ## State machine
//!
//! ```text
//! Received ─▶ MetadataExtracted ─▶ VariantsRendered ─▶ Persisted ─▶ Cataloged
//!     │               │                    │               │
//!     └───────────────┴──────── Failed ◀───┴───────────────┘
//! ```
//!
//! Every transition happens inside one call. A failure after some variants
//! were written deletes those keys again before the error is returned.
//!
//! ## Batches
//!
//! [`IngestCoordinator::ingest_batch`] runs one state machine per file in
//! submission order. A failing file is reported and the batch moves on.

use crate::error::{ErrorKind, ValidationError};
use crate::imaging::{ImageBackend, RenderedImage, VariantSettings, render_variants};
use crate::metadata::{self, ExtractionStatus};
use crate::store::{BlobBackend, DeleteReport, ObjectStore, StorageError, StoredObject, keys};
use crate::types::{
    Photo, PhotoId, PhotoKind, PhotoVariants, ProjectId, VariantClass, VariantRecord,
    normalize_tags,
};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Position of one upload in the ingestion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    Received,
    MetadataExtracted,
    VariantsRendered,
    Persisted,
    Cataloged,
    Failed,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::MetadataExtracted => "metadata_extracted",
            Self::VariantsRendered => "variants_rendered",
            Self::Persisted => "persisted",
            Self::Cataloged => "cataloged",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal failure of one upload.
///
/// `Display` names only the class of failure. The state the upload was in
/// and the underlying cause are available for logs and callers that need
/// them.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("unreadable image")]
    UnreadableImage { state: IngestState, reason: String },
    #[error("storage error: photo could not be saved")]
    Storage {
        state: IngestState,
        #[source]
        source: StorageError,
    },
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UnreadableImage { .. } => ErrorKind::UnreadableImage,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// The last state reached before the upload failed.
    pub fn state(&self) -> IngestState {
        match self {
            Self::Validation(_) => IngestState::Received,
            Self::UnreadableImage { state, .. } | Self::Storage { state, .. } => *state,
        }
    }
}

/// Optional classification supplied with an upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    pub kind: PhotoKind,
    pub caption: Option<String>,
    pub tags: Vec<String>,
}

/// One file handed over by the routing layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub project_id: ProjectId,
    pub owner_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub options: UploadOptions,
}

impl Upload {
    pub fn new(
        project_id: ProjectId,
        owner_id: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            project_id,
            owner_id: owner_id.into(),
            filename: filename.into(),
            bytes,
            options: UploadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub filename: String,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Per-file partition of a batch upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<Photo>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    fn record(&mut self, filename: &str, outcome: Result<Photo, IngestError>) {
        match outcome {
            Ok(photo) => self.succeeded.push(photo),
            Err(e) => self.failed.push(BatchFailure {
                filename: filename.to_string(),
                kind: e.kind(),
                reason: e.to_string(),
            }),
        }
    }
}

pub struct IngestCoordinator<'a, I: ImageBackend, B: BlobBackend> {
    backend: &'a I,
    store: &'a ObjectStore<B>,
    settings: &'a VariantSettings,
}

impl<'a, I: ImageBackend, B: BlobBackend> IngestCoordinator<'a, I, B> {
    pub fn new(backend: &'a I, store: &'a ObjectStore<B>, settings: &'a VariantSettings) -> Self {
        Self {
            backend,
            store,
            settings,
        }
    }

    /// Ingest one upload.
    pub fn ingest_photo(&self, upload: &Upload) -> Result<Photo, IngestError> {
        let photo_id = PhotoId::new();
        self.run(photo_id, upload).inspect_err(|e| {
            warn!(
                photo_id = %photo_id,
                filename = %upload.filename,
                state = %e.state(),
                kind = %e.kind(),
                error = ?e,
                "ingestion failed"
            );
        })
    }

    /// Ingest every upload in order. One failure never affects another file.
    pub fn ingest_batch(&self, uploads: &[Upload]) -> BatchReport {
        let mut report = BatchReport::default();
        for upload in uploads {
            report.record(&upload.filename, self.ingest_photo(upload));
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        report
    }

    /// Read and ingest files from disk one at a time, in order.
    ///
    /// A file that cannot be read fails as an unreadable image; the rest of
    /// the batch still runs.
    pub fn ingest_files(
        &self,
        paths: &[PathBuf],
        project_id: ProjectId,
        owner_id: &str,
        options: &UploadOptions,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let outcome = fs::read(path)
                .map_err(|e| {
                    warn!(path = %path.display(), error = %e, "could not read file");
                    IngestError::UnreadableImage {
                        state: IngestState::Received,
                        reason: format!("could not read {}: {e}", path.display()),
                    }
                })
                .and_then(|bytes| {
                    let upload = Upload::new(project_id, owner_id, filename.clone(), bytes)
                        .with_options(options.clone());
                    self.ingest_photo(&upload)
                });
            report.record(&filename, outcome);
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        report
    }

    /// Remove every stored variant of a photo.
    pub fn permanently_delete(&self, project: ProjectId, photo: PhotoId) -> DeleteReport {
        self.store.delete_by_prefix(project, photo)
    }

    fn run(&self, photo_id: PhotoId, upload: &Upload) -> Result<Photo, IngestError> {
        validate(upload)?;
        let mut state = IngestState::Received;
        debug!(photo_id = %photo_id, filename = %upload.filename, size = upload.bytes.len(), %state);

        let report = metadata::extract(self.backend, &upload.bytes);
        if let ExtractionStatus::Failed { reason } = &report.status {
            debug!(photo_id = %photo_id, reason = %reason, "metadata extraction incomplete");
        }
        let Some(source) = report.source else {
            return Err(IngestError::UnreadableImage {
                state,
                reason: "image header could not be read".to_string(),
            });
        };
        let capture = report.metadata;
        state = IngestState::MetadataExtracted;
        debug!(photo_id = %photo_id, %state);

        let rendered = render_variants(
            self.backend,
            &upload.bytes,
            &source,
            capture.orientation,
            self.settings,
        )
        .map_err(|e| IngestError::UnreadableImage {
            state,
            reason: e.to_string(),
        })?;
        state = IngestState::VariantsRendered;
        debug!(photo_id = %photo_id, %state);

        let (width, height) = capture
            .orientation
            .upright((source.dimensions.width, source.dimensions.height));
        let original = RenderedImage {
            bytes: upload.bytes.clone(),
            width,
            height,
            content_type: source.content_type(),
        };
        let variants = self
            .persist(upload, photo_id, original, rendered.display, rendered.thumbnail)
            .map_err(|source| IngestError::Storage { state, source })?;
        state = IngestState::Persisted;
        debug!(photo_id = %photo_id, %state);

        let has_gps = capture.has_gps();
        let photo = Photo {
            id: photo_id,
            project_id: upload.project_id,
            owner_id: upload.owner_id.clone(),
            original_filename: upload.filename.clone(),
            variants,
            width,
            height,
            metadata: capture,
            has_gps,
            kind: upload.options.kind,
            caption: upload
                .options
                .caption
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
            tags: normalize_tags(&upload.options.tags),
            created_at: Utc::now(),
            deleted_at: None,
        };
        state = IngestState::Cataloged;
        info!(photo_id = %photo_id, width, height, has_gps, %state, "photo ingested");
        Ok(photo)
    }

    /// Write original, display and thumbnail; on failure, delete what was
    /// already written.
    fn persist(
        &self,
        upload: &Upload,
        photo_id: PhotoId,
        original: RenderedImage,
        display: RenderedImage,
        thumbnail: RenderedImage,
    ) -> Result<PhotoVariants, StorageError> {
        let filename = keys::sanitize_filename(&upload.filename);
        let derived_name = keys::with_extension(&filename, self.settings.format.extension());

        let plan = [
            (VariantClass::Original, filename.as_str(), original),
            (VariantClass::Display, derived_name.as_str(), display),
            (VariantClass::Thumbnail, derived_name.as_str(), thumbnail),
        ];

        let mut written: Vec<VariantRecord> = Vec::with_capacity(plan.len());
        for (class, name, image) in plan {
            let key = keys::variant_key(upload.project_id, class, photo_id, name);
            match self.store.put(&image.bytes, &key, image.content_type) {
                Ok(stored) => written.push(record(stored, &image)),
                Err(e) => {
                    self.rollback(&written);
                    return Err(e);
                }
            }
        }

        let mut written = written.into_iter();
        match (written.next(), written.next(), written.next()) {
            (Some(original), Some(display), Some(thumbnail)) => Ok(PhotoVariants {
                original,
                display,
                thumbnail,
            }),
            _ => Err(StorageError::Backend {
                key: keys::variant_prefix(upload.project_id, VariantClass::Original, photo_id),
                reason: "variant set incomplete".to_string(),
            }),
        }
    }

    fn rollback(&self, written: &[VariantRecord]) {
        for record in written {
            match self.store.delete(&record.key) {
                Ok(_) => debug!(key = %record.key, "rolled back variant"),
                Err(e) => warn!(key = %record.key, error = %e, "rollback failed"),
            }
        }
    }
}

fn validate(upload: &Upload) -> Result<(), ValidationError> {
    if upload.bytes.is_empty() {
        return Err(ValidationError("upload is empty".to_string()));
    }
    if upload.filename.trim().is_empty() {
        return Err(ValidationError("filename is required".to_string()));
    }
    if upload.owner_id.trim().is_empty() {
        return Err(ValidationError("owner is required".to_string()));
    }
    Ok(())
}

fn record(stored: StoredObject, image: &RenderedImage) -> VariantRecord {
    VariantRecord {
        key: stored.key,
        address: stored.address,
        content_type: image.content_type.to_string(),
        width: image.width,
        height: image.height,
        byte_size: stored.size,
        checksum: format!("{:x}", Sha256::digest(&image.bytes)),
    }
}
