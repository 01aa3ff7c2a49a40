//! # vintry-import
//!
//! Bulk-import engine for the vintry resolver.
//!
//! This crate provides:
//! - Tolerant parsing of column-mapped spreadsheet rows into typed rows,
//!   with per-row errors that never abort siblings
//! - The deterministic row aggregator: N rows resolved to the same catalog
//!   entity collapse into one idempotent upsert payload
//! - The preview/commit flow: resolve everything and report stats before
//!   any write, then commit through the idempotent catalog writer
//!
//! ## Example
//!
//! ```ignore
//! use vintry_import::{commit, preview, ImportOptions};
//!
//! let snapshot = catalog.snapshot().await?;
//! let preview = preview(&raw_rows, &snapshot, &ImportOptions::default());
//! println!("{} exact, {} need review", preview.stats.exact_matches,
//!          preview.stats.likely_matches);
//!
//! let outcome = commit(&preview, &snapshot, catalog.as_ref()).await?;
//! println!("{} items upserted", outcome.upserted_items);
//! ```

pub mod aggregate;
pub mod preview;
pub mod row;

// Re-export core types
pub use vintry_core::models::{BottleStatus, MatchTier};

pub use aggregate::{aggregate, AggregatedRow};
pub use preview::{
    commit, preview, ImportCommitOutcome, ImportOptions, ImportPreview, ImportStats, PreviewRow,
};
pub use row::{ImportRow, RawRow, RowError};
