//! # vintry-core
//!
//! Core types, traits, and abstractions for the vintry catalog resolver.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other vintry crates depend on: the shared domain models, the
//! `Confidence` newtype, the error taxonomy, centralized defaults, the
//! structured-logging schema, upload ingestion validation, and the injected
//! collaborator seams (extractor, catalog reader/writer, review sink).

pub mod catalog;
pub mod confidence;
pub mod defaults;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod text;
pub mod traits;

// Re-export commonly used types at crate root
pub use catalog::{MemoryCatalog, MemoryReviewSink};
pub use confidence::Confidence;
pub use error::{Error, Result};
pub use ingest::{content_hash, detect_image_mime, validate_image, UploadValidation};
pub use models::*;
pub use text::normalize;
pub use traits::{CatalogReader, CatalogWriter, FieldExtractor, ReviewSink};
