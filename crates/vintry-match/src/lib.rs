//! # vintry-match
//!
//! Fuzzy entity matching for the vintry resolver.
//!
//! This crate provides:
//! - The similarity kernel: shared normalization + bigram Dice coefficient
//! - The catalog matcher: weighted field scoring with a hard admission
//!   threshold, vintage-aware ranking, and tier derivation
//!
//! ## Example
//!
//! ```ignore
//! use vintry_match::{match_entries, MatcherConfig};
//! use vintry_core::MatchQuery;
//!
//! let query = MatchQuery::new("Château Margaux", "Margaux").with_vintage(2015);
//! let result = match_entries(&query, &catalog_snapshot, &MatcherConfig::default());
//! println!("{} ({} candidates)", result.tier, result.candidates.len());
//! ```

pub mod matcher;
pub mod similarity;

// Re-export core types
pub use vintry_core::models::{MatchCandidate, MatchQuery, MatchResult, MatchTier};

pub use matcher::{match_entries, MatcherConfig};
pub use similarity::similarity;
