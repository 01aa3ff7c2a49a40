//! Collaborator seams for the resolution pipeline.
//!
//! The original system threaded shared ambient clients through closures;
//! here every external collaborator is an injected trait object so the
//! quality gate, matcher, and aggregator stay pure and the pipeline is
//! testable against in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CatalogEntry, ExtractionOutcome, ReviewPayload, UpsertEntry};

/// Vision/text extraction collaborator: turns label-photo bytes into
/// structured field guesses.
///
/// Treated as a black box that may fail or hang; the pipeline bounds every
/// call with a timeout and treats a timeout identically to a failure.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract structured fields from an image.
    async fn extract(&self, bytes: &[u8], mime_type: &str) -> Result<ExtractionOutcome>;
}

/// Read side of the catalog store. All reads are point-in-time snapshots.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Search catalog entries by free text (producer or wine name).
    async fn search(&self, text: &str) -> Result<Vec<CatalogEntry>>;

    /// Full snapshot listing, for batch matching.
    async fn snapshot(&self) -> Result<Vec<CatalogEntry>>;
}

/// Write side of the catalog store.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Idempotent upsert keyed on [`UpsertEntry::natural_key`]: two writers
    /// racing to create the same entity must converge on one id.
    async fn upsert(&self, entry: UpsertEntry) -> Result<Uuid>;
}

/// Human moderation queue (produced interface). The pipeline emits review
/// payloads; a human-facing collaborator consumes them and later reports an
/// accept/reject/edit decision out of band.
#[async_trait]
pub trait ReviewSink: Send + Sync {
    /// Enqueue a payload for human review.
    async fn enqueue(&self, payload: ReviewPayload) -> Result<()>;
}
