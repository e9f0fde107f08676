//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file is
//! sparse: stock defaults are the base layer and the user file overrides
//! only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [variants]
//! display_max_edge = 2048     # Longest edge of the display variant
//! display_quality = 85
//! thumbnail_size = 400        # Square thumbnail edge
//! thumbnail_quality = 80
//! thumbnail_sharpening = true
//! format = "jpeg"             # jpeg | avif
//!
//! [storage]
//! root = "storage"            # Filesystem backend directory
//! public_base_url = "https://cdn.example.com"
//! signing_secret = "change-me"
//! presign_ttl_secs = 3600
//! max_presign_ttl_secs = 604800
//!
//! [composite]
//! width = 2400
//! height = 1200
//! quality = 90
//! max_canvas_edge = 8192
//! before_label = "BEFORE"
//! after_label = "AFTER"
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The loaded [`PipelineConfig`] is turned into the plain settings structs
//! each component takes ([`VariantSettings`], [`StorageSettings`],
//! [`CompositeSettings`]), which are constructed once and passed down.

use crate::composite::CompositeSettings;
use crate::imaging::{OutputFormat, Quality, Sharpening, VariantSettings};
use crate::store::StorageSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Derived variant sizes and encoder settings.
    pub variants: VariantsConfig,
    /// Object store location, addressing and presigning.
    pub storage: StorageConfig,
    /// Composite canvas defaults and labels.
    pub composite: CompositeConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.variants;
        for (name, quality) in [
            ("variants.display_quality", v.display_quality),
            ("variants.thumbnail_quality", v.thumbnail_quality),
            ("composite.quality", self.composite.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{name} must be 1-100")));
            }
        }
        if v.display_max_edge == 0 || v.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "variants sizes must be non-zero".into(),
            ));
        }
        if v.display_max_edge < v.thumbnail_size {
            return Err(ConfigError::Validation(
                "variants.display_max_edge must be at least variants.thumbnail_size".into(),
            ));
        }

        let s = &self.storage;
        if s.signing_secret.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.signing_secret must not be empty".into(),
            ));
        }
        if s.public_base_url.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "storage.public_base_url must not be empty".into(),
            ));
        }
        if s.presign_ttl_secs == 0 || s.presign_ttl_secs > s.max_presign_ttl_secs {
            return Err(ConfigError::Validation(
                "storage.presign_ttl_secs must be 1..=max_presign_ttl_secs".into(),
            ));
        }

        let c = &self.composite;
        if c.width == 0 || c.height == 0 {
            return Err(ConfigError::Validation(
                "composite width and height must be non-zero".into(),
            ));
        }
        if c.width > c.max_canvas_edge || c.height > c.max_canvas_edge {
            return Err(ConfigError::Validation(
                "composite canvas exceeds composite.max_canvas_edge".into(),
            ));
        }
        Ok(())
    }

    pub fn variant_settings(&self) -> VariantSettings {
        let v = &self.variants;
        VariantSettings {
            display_max_edge: v.display_max_edge,
            display_quality: Quality::new(v.display_quality),
            thumbnail_size: v.thumbnail_size,
            thumbnail_quality: Quality::new(v.thumbnail_quality),
            thumbnail_sharpening: v.thumbnail_sharpening.then(Sharpening::light),
            format: v.format,
        }
    }

    pub fn storage_settings(&self) -> StorageSettings {
        let s = &self.storage;
        StorageSettings {
            public_base_url: s.public_base_url.trim_end_matches('/').to_string(),
            signing_secret: s.signing_secret.clone(),
            presign_ttl_secs: s.presign_ttl_secs,
            max_presign_ttl_secs: s.max_presign_ttl_secs,
        }
    }

    pub fn composite_settings(&self) -> CompositeSettings {
        let c = &self.composite;
        CompositeSettings {
            width: c.width,
            height: c.height,
            quality: Quality::new(c.quality),
            format: self.variants.format,
            max_canvas_edge: c.max_canvas_edge,
            before_label: c.before_label.clone(),
            after_label: c.after_label.clone(),
        }
    }
}

/// Derived variant settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantsConfig {
    /// Longest edge of the display variant. Smaller sources are not upscaled.
    pub display_max_edge: u32,
    pub display_quality: u32,
    /// Edge of the square thumbnail.
    pub thumbnail_size: u32,
    pub thumbnail_quality: u32,
    /// Light unsharp mask after thumbnail downscale.
    pub thumbnail_sharpening: bool,
    /// Encoder for display, thumbnail and composite output.
    pub format: OutputFormat,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        let stock = VariantSettings::default();
        Self {
            display_max_edge: stock.display_max_edge,
            display_quality: stock.display_quality.value(),
            thumbnail_size: stock.thumbnail_size,
            thumbnail_quality: stock.thumbnail_quality.value(),
            thumbnail_sharpening: stock.thumbnail_sharpening.is_some(),
            format: stock.format,
        }
    }
}

/// Object store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory of the filesystem backend.
    pub root: PathBuf,
    pub public_base_url: String,
    pub signing_secret: String,
    pub presign_ttl_secs: u64,
    pub max_presign_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let stock = StorageSettings::default();
        Self {
            root: PathBuf::from("storage"),
            public_base_url: stock.public_base_url,
            signing_secret: stock.signing_secret,
            presign_ttl_secs: stock.presign_ttl_secs,
            max_presign_ttl_secs: stock.max_presign_ttl_secs,
        }
    }
}

/// Composite canvas settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    /// Upper bound on either canvas edge, including per-request sizes.
    pub max_canvas_edge: u32,
    pub before_label: String,
    pub after_label: String,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        let stock = CompositeSettings::default();
        Self {
            width: stock.width,
            height: stock.height,
            quality: stock.quality.value(),
            max_canvas_edge: stock.max_canvas_edge,
            before_label: stock.before_label,
            after_label: stock.after_label,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PipelineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `config.toml` path.
///
/// A missing file yields the stock defaults. User values are merged on top
/// of the defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photoforge Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Derived variants
# ---------------------------------------------------------------------------
[variants]
# Longest edge of the display variant. Smaller photos are never upscaled.
display_max_edge = 2048
# Encoder quality (1-100) for the display variant.
display_quality = 85
# Edge of the square, center-cropped thumbnail.
thumbnail_size = 400
thumbnail_quality = 80
# Apply a light unsharp mask after downscaling thumbnails.
thumbnail_sharpening = true
# Output encoder for display, thumbnail and composite images: "jpeg" or "avif".
# Originals are always stored byte-for-byte as uploaded.
format = "jpeg"

# ---------------------------------------------------------------------------
# Object store
# ---------------------------------------------------------------------------
[storage]
# Directory holding stored objects.
root = "storage"
# Public prefix of every returned address.
public_base_url = "https://cdn.example.com"
# HMAC key for presigned download addresses. Change this.
signing_secret = "change-me"
# Default and maximum lifetime of a presigned address, in seconds.
presign_ttl_secs = 3600
max_presign_ttl_secs = 604800

# ---------------------------------------------------------------------------
# Before/after composites
# ---------------------------------------------------------------------------
[composite]
# Default canvas size when a request does not name one.
width = 2400
height = 1200
# Encoder quality (1-100).
quality = 90
# Largest canvas edge any request may ask for.
max_canvas_edge = 8192
# Text drawn when labels are requested.
before_label = "BEFORE"
after_label = "AFTER"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.variants.display_max_edge, 2048);
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.composite.width, 2400);
    }

    #[test]
    fn parse_partial_config() {
        let config: PipelineConfig = toml::from_str(
            r#"
[variants]
thumbnail_size = 256
"#,
        )
        .unwrap();
        assert_eq!(config.variants.thumbnail_size, 256);
        // Defaults preserved
        assert_eq!(config.variants.display_max_edge, 2048);
        assert_eq!(config.composite.before_label, "BEFORE");
    }

    #[test]
    fn parse_output_format() {
        let config: PipelineConfig = toml::from_str(
            r#"
[variants]
format = "avif"
"#,
        )
        .unwrap();
        assert_eq!(config.variants.format, OutputFormat::Avif);
        assert_eq!(config.composite_settings().format, OutputFormat::Avif);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<PipelineConfig, _> = toml::from_str(
            r#"
[variants]
display_max = 100
"#,
        );
        assert!(result.is_err());

        let result: Result<PipelineConfig, _> = toml::from_str("[gallery]\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // validation
    // =========================================================================

    #[test]
    fn validate_rejects_bad_quality() {
        let mut config = PipelineConfig::default();
        config.variants.display_quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = PipelineConfig::default();
        config.composite.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_thumbnail_larger_than_display() {
        let mut config = PipelineConfig::default();
        config.variants.thumbnail_size = 4096;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_secret() {
        let mut config = PipelineConfig::default();
        config.storage.signing_secret = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_ttl_above_max() {
        let mut config = PipelineConfig::default();
        config.storage.presign_ttl_secs = config.storage.max_presign_ttl_secs + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_canvas_over_limit() {
        let mut config = PipelineConfig::default();
        config.composite.max_canvas_edge = 1000;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // conversions
    // =========================================================================

    #[test]
    fn variant_settings_follow_config() {
        let mut config = PipelineConfig::default();
        config.variants.thumbnail_sharpening = false;
        config.variants.display_quality = 70;
        let settings = config.variant_settings();
        assert_eq!(settings.thumbnail_sharpening, None);
        assert_eq!(settings.display_quality, Quality::new(70));
        assert_eq!(PipelineConfig::default().variant_settings(), VariantSettings::default());
    }

    #[test]
    fn storage_settings_trim_base_url() {
        let mut config = PipelineConfig::default();
        config.storage.public_base_url = "https://img.test/".into();
        assert_eq!(config.storage_settings().public_base_url, "https://img.test");
    }

    #[test]
    fn composite_settings_default_matches_stock() {
        assert_eq!(
            PipelineConfig::default().composite_settings(),
            CompositeSettings::default()
        );
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[composite]
width = 2400
height = 1200
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[composite]
height = 900
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let composite = merged.get("composite").unwrap();
        assert_eq!(composite.get("width").unwrap().as_integer(), Some(2400));
        assert_eq!(composite.get("height").unwrap().as_integer(), Some(900));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[storage]
root = "/var/lib/photoforge"
signing_secret = "s3cret"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/var/lib/photoforge"));
        assert_eq!(config.storage.signing_secret, "s3cret");
        // Unspecified values should be defaults
        assert_eq!(config.storage.presign_ttl_secs, 3600);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[variants]
thumbnail_quality = 200
"#,
        )
        .unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: PipelineConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[variants]"));
        assert!(content.contains("[storage]"));
        assert!(content.contains("[composite]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("variants").is_some());
        assert!(val.get("storage").is_some());
        assert!(val.get("composite").is_some());
    }
}
