//! Before/after composite rendering.
//!
//! A composite combines the display variants of two cataloged photos onto
//! one canvas. Every render is stateless and writes a brand-new key; only
//! the caller decides which address a comparison points at. Two renders of
//! the same comparison racing each other both succeed and the last one
//! recorded wins.
//!
//! ## Flow
//!
//! ```text
//! request ──validate──▶ resolve photos ──fetch display bytes──▶ compose ──▶ put
//!          (canvas,      (PhotoDirectory)   (ObjectStore::get)   (backend)
//!           labels)
//! ```
//!
//! Validation runs before any image work. Nothing is persisted unless the
//! whole render succeeded.

use crate::error::{ErrorKind, ValidationError};
use crate::imaging::{BackendError, CompositeParams, ImageBackend, Labels, OutputFormat, Quality};
use crate::store::{BlobBackend, ObjectStore, StorageError, keys};
use crate::types::{Comparison, ComparisonId, Layout, Photo, PhotoId, ProjectId};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Terminal failure of a composite render.
///
/// `Display` is deliberately coarse: no keys, paths, or backend detail.
/// The cause stays reachable through `source()` and in the logs.
#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("render error: source image unavailable")]
    SourceUnavailable {
        photo_id: PhotoId,
        #[source]
        source: StorageError,
    },
    #[error("render error: compositing failed")]
    Render(#[source] BackendError),
    #[error("storage error: composite could not be saved")]
    Storage(#[source] StorageError),
}

impl CompositeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::SourceUnavailable { .. } | Self::Render(_) => ErrorKind::Render,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Catalog lookup for the photos a comparison references.
pub trait PhotoDirectory {
    fn photo(&self, id: PhotoId) -> Option<&Photo>;
}

impl PhotoDirectory for [Photo] {
    fn photo(&self, id: PhotoId) -> Option<&Photo> {
        self.iter().find(|p| p.id == id)
    }
}

impl PhotoDirectory for Vec<Photo> {
    fn photo(&self, id: PhotoId) -> Option<&Photo> {
        self.as_slice().photo(id)
    }
}

impl PhotoDirectory for HashMap<PhotoId, Photo> {
    fn photo(&self, id: PhotoId) -> Option<&Photo> {
        self.get(&id)
    }
}

/// Canvas defaults and limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSettings {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub format: OutputFormat,
    pub max_canvas_edge: u32,
    pub before_label: String,
    pub after_label: String,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            width: 2400,
            height: 1200,
            quality: Quality::new(90),
            format: OutputFormat::Jpeg,
            max_canvas_edge: 8192,
            before_label: "BEFORE".to_string(),
            after_label: "AFTER".to_string(),
        }
    }
}

/// One render request. Unset fields fall back to [`CompositeSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRequest {
    pub project_id: ProjectId,
    pub comparison_id: ComparisonId,
    pub before_photo_id: PhotoId,
    pub after_photo_id: PhotoId,
    pub layout: Layout,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub add_labels: bool,
    pub before_label: Option<String>,
    pub after_label: Option<String>,
}

impl CompositeRequest {
    pub fn new(
        project_id: ProjectId,
        comparison_id: ComparisonId,
        before_photo_id: PhotoId,
        after_photo_id: PhotoId,
        layout: Layout,
    ) -> Self {
        Self {
            project_id,
            comparison_id,
            before_photo_id,
            after_photo_id,
            layout,
            width: None,
            height: None,
            add_labels: false,
            before_label: None,
            after_label: None,
        }
    }

    /// Request mirroring a comparison's current photos and layout.
    pub fn for_comparison(comparison: &Comparison) -> Self {
        Self::new(
            comparison.project_id,
            comparison.id,
            comparison.before_photo_id,
            comparison.after_photo_id,
            comparison.layout,
        )
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_labels(mut self) -> Self {
        self.add_labels = true;
        self
    }
}

/// A persisted composite.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CompositeOutcome {
    pub key: String,
    pub address: String,
    pub render_id: Uuid,
    pub layout: Layout,
    pub width: u32,
    pub height: u32,
}

pub struct CompositeRenderer<'a, I: ImageBackend, B: BlobBackend> {
    backend: &'a I,
    store: &'a ObjectStore<B>,
    settings: &'a CompositeSettings,
}

impl<'a, I: ImageBackend, B: BlobBackend> CompositeRenderer<'a, I, B> {
    pub fn new(backend: &'a I, store: &'a ObjectStore<B>, settings: &'a CompositeSettings) -> Self {
        Self {
            backend,
            store,
            settings,
        }
    }

    /// Render and persist one composite.
    pub fn render<D>(
        &self,
        directory: &D,
        request: &CompositeRequest,
    ) -> Result<CompositeOutcome, CompositeError>
    where
        D: PhotoDirectory + ?Sized,
    {
        let (width, height) = self.canvas_size(request)?;
        let labels = self.labels(request);
        let before = resolve_photo(directory, request.project_id, request.before_photo_id)?;
        let after = resolve_photo(directory, request.project_id, request.after_photo_id)?;

        info!(
            comparison_id = %request.comparison_id,
            layout = %request.layout,
            width,
            height,
            "rendering composite"
        );

        let before_bytes = self.fetch_display(before)?;
        let after_bytes = self.fetch_display(after)?;

        let bytes = self
            .backend
            .composite(&CompositeParams {
                before: &before_bytes,
                after: &after_bytes,
                layout: request.layout,
                width,
                height,
                labels,
                format: self.settings.format,
                quality: self.settings.quality,
            })
            .map_err(|e| {
                warn!(comparison_id = %request.comparison_id, error = %e, "composite render failed");
                CompositeError::Render(e)
            })?;

        let render_id = Uuid::new_v4();
        let key = keys::composite_key(
            request.project_id,
            request.comparison_id,
            render_id,
            self.settings.format.extension(),
        );
        let stored = self
            .store
            .put(&bytes, &key, self.settings.format.content_type())
            .map_err(|e| {
                warn!(comparison_id = %request.comparison_id, error = %e, "composite not stored");
                CompositeError::Storage(e)
            })?;

        info!(
            comparison_id = %request.comparison_id,
            render_id = %render_id,
            size = stored.size,
            "composite stored"
        );
        Ok(CompositeOutcome {
            key: stored.key,
            address: stored.address,
            render_id,
            layout: request.layout,
            width,
            height,
        })
    }

    /// Render a comparison's composite and record the new address on it.
    ///
    /// The comparison is left untouched when the render fails.
    pub fn regenerate<D>(
        &self,
        directory: &D,
        comparison: &mut Comparison,
        size: Option<(u32, u32)>,
        add_labels: bool,
    ) -> Result<CompositeOutcome, CompositeError>
    where
        D: PhotoDirectory + ?Sized,
    {
        let mut request = CompositeRequest::for_comparison(comparison);
        if let Some((width, height)) = size {
            request = request.with_size(width, height);
        }
        request.add_labels = add_labels;

        let outcome = self.render(directory, &request)?;
        comparison.record_composite(outcome.address.clone());
        Ok(outcome)
    }

    fn canvas_size(&self, request: &CompositeRequest) -> Result<(u32, u32), ValidationError> {
        let width = request.width.unwrap_or(self.settings.width);
        let height = request.height.unwrap_or(self.settings.height);
        let max = self.settings.max_canvas_edge;
        if width == 0 || height == 0 {
            return Err(ValidationError(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        if width > max || height > max {
            return Err(ValidationError(format!(
                "canvas {width}x{height} exceeds the {max}px edge limit"
            )));
        }
        Ok((width, height))
    }

    fn labels(&self, request: &CompositeRequest) -> Option<Labels> {
        if !request.add_labels {
            return None;
        }
        Some(Labels {
            before: request
                .before_label
                .clone()
                .unwrap_or_else(|| self.settings.before_label.clone()),
            after: request
                .after_label
                .clone()
                .unwrap_or_else(|| self.settings.after_label.clone()),
        })
    }

    fn fetch_display(&self, photo: &Photo) -> Result<Vec<u8>, CompositeError> {
        self.store.get(&photo.variants.display.key).map_err(|e| {
            warn!(photo_id = %photo.id, error = %e, "display variant unavailable");
            CompositeError::SourceUnavailable {
                photo_id: photo.id,
                source: e,
            }
        })
    }
}

/// Look up a photo and check it may be composited.
fn resolve_photo<D>(directory: &D, project: ProjectId, id: PhotoId) -> Result<&Photo, ValidationError>
where
    D: PhotoDirectory + ?Sized,
{
    let photo = directory
        .photo(id)
        .ok_or_else(|| ValidationError(format!("unknown photo {id}")))?;
    if photo.project_id != project {
        return Err(ValidationError(format!(
            "photo {id} belongs to a different project"
        )));
    }
    if photo.is_deleted() {
        return Err(ValidationError(format!("photo {id} is deleted")));
    }
    Ok(photo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::store::MemoryBackend;
    use crate::test_helpers::{catalog_photo, memory_store};
    use chrono::Utc;

    struct Fixture {
        store: ObjectStore<MemoryBackend>,
        project: ProjectId,
        photos: Vec<Photo>,
    }

    fn fixture() -> Fixture {
        let store = memory_store();
        let project = ProjectId::new();
        let photos = vec![
            catalog_photo(&store, project, b"before-display"),
            catalog_photo(&store, project, b"after-display"),
        ];
        Fixture {
            store,
            project,
            photos,
        }
    }

    fn request(f: &Fixture, layout: Layout) -> CompositeRequest {
        CompositeRequest::new(
            f.project,
            ComparisonId::new(),
            f.photos[0].id,
            f.photos[1].id,
            layout,
        )
    }

    #[test]
    fn render_stores_under_composite_namespace() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);

        let req = request(&f, Layout::SideBySide);
        let outcome = renderer.render(f.photos.as_slice(), &req).unwrap();

        assert!(outcome.key.starts_with(&format!(
            "projects/{}/composites/{}/",
            f.project, req.comparison_id
        )));
        assert!(outcome.key.ends_with(".jpg"));
        assert_eq!(outcome.address, format!("https://cdn.test/{}", outcome.key));
        assert_eq!((outcome.width, outcome.height), (2400, 1200));
        assert_eq!(f.store.get(&outcome.key).unwrap(), b"composite-2400x1200");

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Composite {
                layout: Layout::SideBySide,
                width: 2400,
                height: 1200,
                labeled: false,
            }]
        );
    }

    #[test]
    fn each_render_gets_a_fresh_key() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);
        let req = request(&f, Layout::Diagonal).with_size(800, 600);

        let a = renderer.render(f.photos.as_slice(), &req).unwrap();
        let b = renderer.render(f.photos.as_slice(), &req).unwrap();
        assert_ne!(a.key, b.key);
        assert_eq!((a.width, a.height), (b.width, b.height));
    }

    #[test]
    fn labels_use_settings_defaults() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);

        let req = request(&f, Layout::Vertical).with_labels();
        assert_eq!(
            renderer.labels(&req),
            Some(Labels {
                before: "BEFORE".into(),
                after: "AFTER".into()
            })
        );
        renderer.render(f.photos.as_slice(), &req).unwrap();
        assert!(matches!(
            backend.get_operations()[0],
            RecordedOp::Composite { labeled: true, .. }
        ));
    }

    #[test]
    fn custom_label_overrides_default() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);
        let mut req = request(&f, Layout::Vertical).with_labels();
        req.after_label = Some("WEEK 6".into());
        assert_eq!(renderer.labels(&req).unwrap().after, "WEEK 6");
    }

    #[test]
    fn unknown_layout_string_is_validation() {
        let err: CompositeError = "mosaic".parse::<Layout>().unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn oversized_canvas_is_rejected_before_any_work() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);

        for (w, h) in [(0, 100), (100, 0), (9000, 100)] {
            let req = request(&f, Layout::SideBySide).with_size(w, h);
            let err = renderer.render(f.photos.as_slice(), &req).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn unknown_photo_is_validation() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);

        let mut req = request(&f, Layout::SideBySide);
        req.after_photo_id = PhotoId::new();
        let err = renderer.render(f.photos.as_slice(), &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn deleted_or_foreign_photo_is_validation() {
        let mut f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();

        f.photos[0].soft_delete(Utc::now());
        let req = request(&f, Layout::SideBySide);
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);
        let err = renderer.render(f.photos.as_slice(), &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut other = request(&f, Layout::SideBySide);
        other.project_id = ProjectId::new();
        let err = renderer.render(f.photos.as_slice(), &other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn missing_display_bytes_is_render_error_and_nothing_stored() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);

        f.store.delete(&f.photos[1].variants.display.key).unwrap();
        let before_count = f.store.backend().len();

        let err = renderer
            .render(f.photos.as_slice(), &request(&f, Layout::SideBySide))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert_eq!(err.to_string(), "render error: source image unavailable");
        assert_eq!(f.store.backend().len(), before_count);
    }

    #[test]
    fn regenerate_records_address_on_comparison() {
        let f = fixture();
        let backend = MockBackend::new();
        let settings = CompositeSettings::default();
        let renderer = CompositeRenderer::new(&backend, &f.store, &settings);

        let mut comparison =
            Comparison::new(f.project, f.photos[0].id, f.photos[1].id, Layout::Diagonal);
        let outcome = renderer
            .regenerate(f.photos.as_slice(), &mut comparison, Some((640, 480)), true)
            .unwrap();
        assert_eq!(comparison.composite_address.as_deref(), Some(outcome.address.as_str()));
        assert_eq!((outcome.width, outcome.height), (640, 480));
    }

    #[test]
    fn hashmap_directory_lookup() {
        let f = fixture();
        let map: HashMap<PhotoId, Photo> = f.photos.iter().map(|p| (p.id, p.clone())).collect();
        assert!(map.photo(f.photos[0].id).is_some());
        assert!(map.photo(PhotoId::new()).is_none());
    }
}
