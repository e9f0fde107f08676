use clap::{Parser, Subcommand};
use photoforge::composite::{CompositeRenderer, CompositeRequest};
use photoforge::imaging::RustBackend;
use photoforge::ingest::{IngestCoordinator, UploadOptions};
use photoforge::store::{FilesystemBackend, ObjectStore};
use photoforge::types::{ComparisonId, Layout, Photo, PhotoId, PhotoKind, ProjectId};
use photoforge::{config, output};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use walkdir::WalkDir;

/// Extensions picked up when an ingest path is a directory.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// Package version on a clean tagged release, `dev@<hash>` otherwise.
fn version_string() -> &'static str {
    if env!("PHOTOFORGE_RELEASE_BUILD") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("PHOTOFORGE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "photoforge")]
#[command(about = "Photo ingestion and before/after composites")]
#[command(long_about = "\
Photo ingestion and before/after composites

Every ingested photo is stored three times under its own id:

  projects/{project}/originals/{photo}/{filename}    # bytes as uploaded
  projects/{project}/display/{photo}/{filename}      # upright, longest edge <= 2048
  projects/{project}/thumbnails/{photo}/{filename}   # upright 400x400 center crop

Composites combine the display variants of two photos:

  side_by_side   before left, after right
  vertical       before top, after bottom
  diagonal       split along the top-left to bottom-right diagonal,
                 before below it, after above it

Set RUST_LOG (e.g. RUST_LOG=photoforge=debug) for detailed logs.
Run 'photoforge gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest image files or directories into a project
    Ingest {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        owner: String,
        /// before | after | progress | detail | general
        #[arg(long, default_value = "general")]
        kind: PhotoKind,
        #[arg(long)]
        caption: Option<String>,
        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// JSON catalog to append ingested photos to
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Render a before/after composite from cataloged photos
    Composite {
        /// JSON catalog written by `ingest`
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        comparison: ComparisonId,
        #[arg(long)]
        before: PhotoId,
        #[arg(long)]
        after: PhotoId,
        /// side_by_side | vertical | diagonal
        #[arg(long, default_value = "side_by_side")]
        layout: Layout,
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
        /// Draw BEFORE/AFTER captions
        #[arg(long)]
        labels: bool,
    },
    /// Permanently delete every stored variant of a photo
    Delete {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        photo: PhotoId,
    },
    /// Print a time-limited download address for a key
    Presign {
        #[arg(long)]
        key: String,
        /// Lifetime in seconds (clamped to the configured maximum)
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    debug!(path = %cli.config.display(), "config loaded");
    let store = ObjectStore::new(
        FilesystemBackend::open(&config.storage.root)?,
        config.storage_settings(),
    );
    let backend = RustBackend::new();

    match cli.command {
        Command::Ingest {
            project,
            owner,
            kind,
            caption,
            tags,
            catalog,
            paths,
        } => {
            let options = UploadOptions {
                kind,
                caption,
                tags,
            };
            let files = collect_images(&paths);
            info!(files = files.len(), "ingesting");

            let settings = config.variant_settings();
            let coordinator = IngestCoordinator::new(&backend, &store, &settings);
            let report = coordinator.ingest_files(&files, project, &owner, &options);
            output::print_ingest_report(&report);

            if let Some(catalog) = catalog {
                let mut photos = read_catalog(&catalog)?;
                photos.extend(report.succeeded.iter().cloned());
                write_catalog(&catalog, &photos)?;
            }
        }
        Command::Composite {
            catalog,
            project,
            comparison,
            before,
            after,
            layout,
            width,
            height,
            labels,
        } => {
            let photos = read_catalog(&catalog)?;
            let mut request = CompositeRequest::new(project, comparison, before, after, layout);
            if let (Some(w), Some(h)) = (width, height) {
                request = request.with_size(w, h);
            }
            request.add_labels = labels;

            let settings = config.composite_settings();
            let renderer = CompositeRenderer::new(&backend, &store, &settings);
            let outcome = renderer.render(photos.as_slice(), &request)?;
            output::print_composite(&outcome);
        }
        Command::Delete { project, photo } => {
            let report = store.delete_by_prefix(project, photo);
            output::print_delete_report(&report);
        }
        Command::Presign { key, ttl } => {
            let ttl = ttl
                .unwrap_or(config.storage.presign_ttl_secs)
                .clamp(1, config.storage.max_presign_ttl_secs);
            // Refuse to sign addresses for objects that do not exist
            let meta = store.head(&key)?;
            let url = store.presigned_download(&key, Some(ttl))?;
            output::print_presigned(&url, ttl, &meta);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Expand directories into their image files; explicit files pass through.
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_image(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }
    files
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn read_catalog(path: &Path) -> Result<Vec<Photo>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_catalog(path: &Path, photos: &[Photo]) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(photos)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0190c3f4-7a2b-7c1d-9e8f-0123456789ab";

    fn composite_args(extra: &[&str]) -> Vec<String> {
        let mut args = vec!["photoforge", "composite", "--catalog", "c.json"];
        for flag in ["--project", "--comparison", "--before", "--after"] {
            args.extend([flag, ID]);
        }
        args.extend(extra);
        args.into_iter().map(String::from).collect()
    }

    #[test]
    fn composite_width_needs_height() {
        let err = Cli::try_parse_from(composite_args(&["--width", "1200"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        let err = Cli::try_parse_from(composite_args(&["--height", "600"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn composite_accepts_both_dimensions() {
        let cli = Cli::try_parse_from(composite_args(&["--width", "1200", "--height", "600"]))
            .unwrap();
        match cli.command {
            Command::Composite { width, height, .. } => {
                assert_eq!((width, height), (Some(1200), Some(600)));
            }
            _ => panic!("expected composite"),
        }
    }
}
