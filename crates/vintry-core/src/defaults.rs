//! Centralized default constants for the vintry resolver.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// IMAGE QUALITY GATE
// =============================================================================
//
// Defaults favor leniency: a false negative (bad photo slips through and
// extraction produces garbage the matcher then rejects) is cheaper than
// blocking a legitimate photo at the door.

/// Minimum width and height in pixels for a usable label photo.
pub const QC_MIN_DIMENSION: u32 = 500;

/// Minimum encoded upload size in bytes. Near-empty or heavily
/// over-compressed captures fall under this.
pub const QC_MIN_FILE_SIZE_BYTES: u64 = 30 * 1024;

/// Minimum variance of the Laplacian response map. Below this the image is
/// considered blurred (higher variance = sharper edges).
pub const QC_MIN_LAPLACIAN_VARIANCE: f64 = 100.0;

/// Minimum acceptable greyscale mean (too dark below this).
pub const QC_MIN_BRIGHTNESS: f64 = 40.0;

/// Maximum acceptable greyscale mean (blown out above this).
pub const QC_MAX_BRIGHTNESS: f64 = 220.0;

/// Minimum mean gradient magnitude over interior pixels.
pub const QC_MIN_SHARPNESS: f64 = 10.0;

// =============================================================================
// MATCHING
// =============================================================================

/// Hard admission threshold for match candidates ("the 70% rule").
///
/// Candidates scoring below this are discarded entirely, never ranked.
/// Chosen empirically in the source system as the point below which false
/// positives (wrong wine) cost more than false negatives (unnecessary
/// new-entity creation). Treat as a calibration default, not a verified
/// business rule; no labeled-data derivation exists for it yet.
pub const MATCH_ADMISSION_THRESHOLD: f64 = 0.70;

/// Confidence at or above which the top candidate is an exact match.
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.80;

/// Confidence bonus applied when the query vintage equals the entry vintage.
pub const VINTAGE_BONUS: f64 = 0.1;

/// Weight of producer similarity in the combined match score.
pub const PRODUCER_WEIGHT: f64 = 0.5;

/// Weight of wine-name similarity in the combined match score.
pub const WINE_NAME_WEIGHT: f64 = 0.5;

// =============================================================================
// ROUTING
// =============================================================================

/// Minimum confidence for committing a match without a human in the loop.
///
/// Same calibration caveat as [`MATCH_ADMISSION_THRESHOLD`].
pub const AUTO_COMMIT_CONFIDENCE: f64 = 0.80;

// =============================================================================
// PIPELINE
// =============================================================================

/// Time bound on the field-extraction collaborator call. A timeout is
/// treated identically to an extraction failure, never as a hang.
pub const EXTRACTION_TIMEOUT_SECS: u64 = 30;

/// Default maximum concurrently processed resolution jobs.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Default worker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Default capacity of the worker's pending-request queue.
pub const WORKER_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// INGESTION
// =============================================================================

/// Maximum accepted upload size in bytes (20 MB).
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

// =============================================================================
// BULK IMPORT
// =============================================================================

/// Character cap for merged notes and merged critic-score blobs.
pub const NOTES_MAX_CHARS: usize = 1000;

/// Separator between distinct merged note values.
pub const NOTES_SEPARATOR: &str = " | ";

/// Quantity assumed for a row whose quantity cell is empty.
pub const DEFAULT_ROW_QUANTITY: u32 = 1;
