//! Error types for the vintry resolver.
//!
//! The failure taxonomy is deliberately narrow: most "failures" in this
//! system are routed outcomes, not errors. A rejected photo is a
//! `QualityReport` with reasons, a failed extraction is
//! `ExtractionOutcome::Failed`, an ambiguous match is a review item, and a
//! bad import row is a `RowError` collected into its batch report. The
//! variants below cover what remains: collaborator faults, malformed input
//! at the ingestion boundary, and programming errors such as illegal stage
//! transitions.

use thiserror::Error;

/// Result type alias using vintry's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vintry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload rejected before decode (blocked type, oversized, not an image)
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Image decode failed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Field extraction collaborator failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Field extraction collaborator exceeded its time bound
    #[error("Extraction timed out after {timeout_secs}s")]
    ExtractionTimeout { timeout_secs: u64 },

    /// Catalog collaborator (read or write) failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Attempted stage transition the resolution state machine forbids
    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
