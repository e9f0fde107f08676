//! # Photoforge
//!
//! Photo ingestion and before/after composite rendering for project photo
//! catalogs. An upload goes in as raw bytes and comes out as a cataloged
//! [`types::Photo`] whose three variants (original, display, thumbnail) sit
//! in an object store behind CDN-style addresses. Two cataloged photos can
//! then be combined into a single before/after composite.
//!
//! # Architecture
//!
//! ```text
//!            ┌────────────── IngestCoordinator ──────────────┐
//! upload ──▶ │ metadata::extract ─▶ render_variants ─▶ put ×3 │ ──▶ Photo
//!            └────────────────────────────────────────────────┘
//!
//!                          ┌──── CompositeRenderer ────┐
//! (before, after, layout) ▶│ get ×2 ─▶ compose ─▶ put  │ ──▶ address
//!                          └───────────────────────────┘
//! ```
//!
//! Both coordinators take their collaborators by reference: an
//! [`imaging::ImageBackend`] for pixel work and a [`store::ObjectStore`] for
//! bytes. Nothing is looked up globally.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ingest`] | Ingestion state machine, batches, rollback, permanent delete |
//! | [`composite`] | Before/after composite rendering and persistence |
//! | [`metadata`] | Container header + EXIF extraction with an explicit outcome |
//! | [`imaging`] | Pure-Rust image operations: identify, resize, thumbnail, compose |
//! | [`store`] | Object keys, blob backends, addresses, presigned URLs, prefix sweeps |
//! | [`types`] | Photo, variant, layout and comparison records |
//! | [`error`] | Coarse error classification shared by both coordinators |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Originals Are Never Re-Encoded
//!
//! The original variant is the uploaded byte stream, stored as-is with the
//! content type its header declares. Display and thumbnail variants are
//! derived from it with EXIF orientation applied, so they render upright
//! without viewer support.
//!
//! ## Photo-Scoped Keys
//!
//! Every variant key contains the photo's own id as a directory segment.
//! Identical uploads never collide and deleting one photo is a prefix sweep
//! that cannot touch another.
//!
//! ## Closed Enums at the Boundary
//!
//! Layouts, variant classes and photo kinds are parsed once from strings and
//! matched as enums from then on.
//!
//! ## Explicit Extraction Outcome
//!
//! Metadata extraction distinguishes "no EXIF in this file" from "EXIF block
//! present but unreadable". Neither aborts ingestion; only an unreadable
//! image does.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decode, resize and
//! encode, and draws composite labels with a built-in bitmap face. There
//! are no system dependencies and no font files to ship.

pub mod composite;
pub mod config;
pub mod error;
pub mod imaging;
pub mod ingest;
pub mod metadata;
pub mod output;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
