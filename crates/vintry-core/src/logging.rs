//! Structured logging schema and field name constants for vintry.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), terminal job outcomes |
//! | DEBUG | Decision points, intermediate scores, config choices |
//! | TRACE | Per-item iteration, high-volume data (candidates, rows) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "vision", "match", "jobs", "import"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "quality_gate", "matcher", "pipeline", "aggregator"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "evaluate", "match_entries", "resolve", "aggregate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Resolution job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Current resolution stage.
pub const STAGE: &str = "stage";

/// Catalog entry UUID.
pub const CATALOG_ID: &str = "catalog_id";

/// Import row number (1-based, file order).
pub const ROW_NUMBER: &str = "row_number";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of candidates surviving the admission filter.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of rows in a batch or aggregation group.
pub const ROW_COUNT: &str = "row_count";

/// Match tier of the top candidate.
pub const TIER: &str = "tier";

/// Combined match score of the top candidate.
pub const TOP_SCORE: &str = "top_score";

/// Laplacian variance measured by the quality gate.
pub const BLUR_VARIANCE: &str = "blur_variance";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize the global tracing subscriber with an env-filter.
///
/// Reads `RUST_LOG` when set, defaulting to `info`. Safe to call more than
/// once; later calls are no-ops.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
