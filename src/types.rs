//! Shared record types returned to catalog collaborators.
//!
//! These types are serialized to JSON by the CLI and by callers that persist
//! catalog rows, so field names here are part of the external contract.
//!
//! The closed enums ([`VariantClass`], [`Layout`], [`PhotoKind`]) are parsed
//! once at the boundary. Everything downstream matches on the enum and never
//! re-checks a string.

use crate::error::ValidationError;
use crate::metadata::CaptureMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Allocate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    ValidationError(format!("invalid {} '{}'", stringify!($name), s))
                })
            }
        }
    };
}

id_type!(
    /// Owning project of photos and comparisons.
    ProjectId
);
id_type!(
    /// Photo identifier; part of every variant key.
    PhotoId
);
id_type!(
    /// Comparison identifier; namespaces composite renders.
    ComparisonId
);

/// The three stored resolutions of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantClass {
    Original,
    Display,
    Thumbnail,
}

impl VariantClass {
    pub const ALL: [VariantClass; 3] = [Self::Original, Self::Display, Self::Thumbnail];

    /// Key-prefix partition for this class.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Original => "originals",
            Self::Display => "display",
            Self::Thumbnail => "thumbnails",
        }
    }
}

impl fmt::Display for VariantClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Original => "original",
            Self::Display => "display",
            Self::Thumbnail => "thumbnail",
        };
        f.write_str(name)
    }
}

/// One persisted variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub key: String,
    /// CDN-style retrieval address, independent of where the bytes live.
    pub address: String,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    /// Hex SHA-256 of the stored bytes.
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoVariants {
    pub original: VariantRecord,
    pub display: VariantRecord,
    pub thumbnail: VariantRecord,
}

impl PhotoVariants {
    pub fn get(&self, class: VariantClass) -> &VariantRecord {
        match class {
            VariantClass::Original => &self.original,
            VariantClass::Display => &self.display,
            VariantClass::Thumbnail => &self.thumbnail,
        }
    }

    pub fn keys(&self) -> [&str; 3] {
        [
            self.original.key.as_str(),
            self.display.key.as_str(),
            self.thumbnail.key.as_str(),
        ]
    }
}

/// Optional classification supplied with an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    Before,
    After,
    Progress,
    Detail,
    #[default]
    General,
}

impl FromStr for PhotoKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "progress" => Ok(Self::Progress),
            "detail" => Ok(Self::Detail),
            "general" => Ok(Self::General),
            other => Err(ValidationError(format!("unsupported photo type '{other}'"))),
        }
    }
}

/// A cataloged photo with all three variants persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub project_id: ProjectId,
    pub owner_id: String,
    pub original_filename: String,
    pub variants: PhotoVariants,
    /// Upright pixel dimensions of the original.
    pub width: u32,
    pub height: u32,
    pub metadata: CaptureMetadata,
    pub has_gps: bool,
    pub kind: PhotoKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn variant(&self, class: VariantClass) -> &VariantRecord {
        self.variants.get(class)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Mark deleted. Variant bytes stay in the store until a permanent
    /// delete sweeps the photo's prefix. The first timestamp wins.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
        }
    }

    pub fn restore(&mut self) {
        self.deleted_at = None;
    }
}

/// Normalize free-form tags: trimmed, lower-cased, deduplicated in first-seen
/// order, empties dropped.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Geometric arrangement of a before/after composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    SideBySide,
    Vertical,
    Diagonal,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SideBySide => "side_by_side",
            Self::Vertical => "vertical",
            Self::Diagonal => "diagonal",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "side_by_side" | "side-by-side" | "sidebyside" => Ok(Self::SideBySide),
            "vertical" => Ok(Self::Vertical),
            "diagonal" => Ok(Self::Diagonal),
            other => Err(ValidationError(format!("unsupported layout '{other}'"))),
        }
    }
}

/// A before/after pairing owned by an external comparison service.
///
/// Only the composite address is written by this crate. Changing either
/// photo or the layout clears it; a new render is the only way to set it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub id: ComparisonId,
    pub project_id: ProjectId,
    pub before_photo_id: PhotoId,
    pub after_photo_id: PhotoId,
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub composite_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_expires_at: Option<DateTime<Utc>>,
}

impl Comparison {
    pub fn new(
        project_id: ProjectId,
        before_photo_id: PhotoId,
        after_photo_id: PhotoId,
        layout: Layout,
    ) -> Self {
        Self {
            id: ComparisonId::new(),
            project_id,
            before_photo_id,
            after_photo_id,
            layout,
            title: None,
            description: None,
            composite_address: None,
            share_token: None,
            share_expires_at: None,
        }
    }

    pub fn set_photos(&mut self, before: PhotoId, after: PhotoId) {
        if before != self.before_photo_id || after != self.after_photo_id {
            self.before_photo_id = before;
            self.after_photo_id = after;
            self.composite_address = None;
        }
    }

    pub fn set_layout(&mut self, layout: Layout) {
        if layout != self.layout {
            self.layout = layout;
            self.composite_address = None;
        }
    }

    pub fn record_composite(&mut self, address: impl Into<String>) {
        self.composite_address = Some(address.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_parses_known_values() {
        assert_eq!("side_by_side".parse::<Layout>().unwrap(), Layout::SideBySide);
        assert_eq!("Side-By-Side".parse::<Layout>().unwrap(), Layout::SideBySide);
        assert_eq!(" vertical ".parse::<Layout>().unwrap(), Layout::Vertical);
        assert_eq!("DIAGONAL".parse::<Layout>().unwrap(), Layout::Diagonal);
    }

    #[test]
    fn layout_rejects_unknown_value() {
        let err = "grid".parse::<Layout>().unwrap_err();
        assert!(err.0.contains("grid"));
        assert!("".parse::<Layout>().is_err());
    }

    #[test]
    fn layout_display_roundtrips() {
        for layout in [Layout::SideBySide, Layout::Vertical, Layout::Diagonal] {
            assert_eq!(layout.to_string().parse::<Layout>().unwrap(), layout);
        }
    }

    #[test]
    fn photo_kind_parses_and_rejects() {
        assert_eq!("Before".parse::<PhotoKind>().unwrap(), PhotoKind::Before);
        assert_eq!("progress".parse::<PhotoKind>().unwrap(), PhotoKind::Progress);
        assert!("selfie".parse::<PhotoKind>().is_err());
    }

    #[test]
    fn ids_parse_from_strings() {
        let id = PhotoId::new();
        assert_eq!(id.to_string().parse::<PhotoId>().unwrap(), id);
        assert!("not-a-uuid".parse::<ProjectId>().is_err());
    }

    #[test]
    fn tags_are_normalized() {
        let tags = normalize_tags([" Roof ", "roof", "", "Gutter", "  "]);
        assert_eq!(tags, vec!["roof", "gutter"]);
    }

    #[test]
    fn variant_namespaces_are_distinct() {
        let ns: Vec<&str> = VariantClass::ALL.iter().map(|c| c.namespace()).collect();
        assert_eq!(ns, vec!["originals", "display", "thumbnails"]);
    }

    fn comparison() -> Comparison {
        let mut c = Comparison::new(
            ProjectId::new(),
            PhotoId::new(),
            PhotoId::new(),
            Layout::SideBySide,
        );
        c.record_composite("https://cdn.example.com/x.jpg");
        c
    }

    #[test]
    fn changing_layout_clears_composite() {
        let mut c = comparison();
        c.set_layout(Layout::Diagonal);
        assert_eq!(c.layout, Layout::Diagonal);
        assert!(c.composite_address.is_none());
    }

    #[test]
    fn setting_same_layout_keeps_composite() {
        let mut c = comparison();
        c.set_layout(Layout::SideBySide);
        assert!(c.composite_address.is_some());
    }

    #[test]
    fn changing_photos_clears_composite() {
        let mut c = comparison();
        let before = c.before_photo_id;
        c.set_photos(before, PhotoId::new());
        assert!(c.composite_address.is_none());
    }

    #[test]
    fn setting_same_photos_keeps_composite() {
        let mut c = comparison();
        let (before, after) = (c.before_photo_id, c.after_photo_id);
        c.set_photos(before, after);
        assert!(c.composite_address.is_some());
    }
}
