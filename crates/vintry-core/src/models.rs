//! Core data models for the vintry resolver.
//!
//! These types are shared across all vintry crates and represent the domain
//! entities flowing through the pipeline: catalog snapshots in, extracted
//! field guesses through the matcher, ranked candidates and quality reports
//! out.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::Confidence;
use crate::text::normalize;

// =============================================================================
// CATALOG TYPES
// =============================================================================

/// Snapshot of an existing catalog record.
///
/// Lifetime is owned by the external catalog store; the resolver only reads
/// point-in-time copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub producer: String,
    pub wine_name: String,
    pub vintage: Option<i32>,
    pub color: Option<String>,
    pub alcohol_percent: Option<f32>,
    pub bottle_size: Option<String>,
}

impl CatalogEntry {
    /// Create an entry with a fresh id and the two identity fields.
    pub fn new(producer: impl Into<String>, wine_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            producer: producer.into(),
            wine_name: wine_name.into(),
            vintage: None,
            color: None,
            alcohol_percent: None,
            bottle_size: None,
        }
    }

    /// Set the vintage.
    pub fn with_vintage(mut self, vintage: i32) -> Self {
        self.vintage = Some(vintage);
        self
    }
}

/// Request for an idempotent catalog upsert.
///
/// Two writers racing to create "the same new entity" must converge on one
/// record; convergence is keyed on [`UpsertEntry::natural_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertEntry {
    pub producer: String,
    pub wine_name: String,
    pub vintage: Option<i32>,
    pub color: Option<String>,
    pub alcohol_percent: Option<f32>,
    pub bottle_size: Option<String>,
    /// Item-level payload (quantity, price, storage location, ...) the
    /// external store attaches to the owner's cellar, opaque to the core.
    pub item: Option<serde_json::Value>,
}

impl UpsertEntry {
    /// Create an upsert request for a bare entity.
    pub fn new(producer: impl Into<String>, wine_name: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            wine_name: wine_name.into(),
            vintage: None,
            color: None,
            alcohol_percent: None,
            bottle_size: None,
            item: None,
        }
    }

    /// Set the vintage.
    pub fn with_vintage(mut self, vintage: Option<i32>) -> Self {
        self.vintage = vintage;
        self
    }

    /// Attach an item-level payload.
    pub fn with_item(mut self, item: serde_json::Value) -> Self {
        self.item = Some(item);
        self
    }

    /// Natural uniqueness key: normalized producer + wine name + vintage.
    ///
    /// Uses the same normalization as the similarity kernel so "Château
    /// Margaux" and "chateau margaux" key identically.
    pub fn natural_key(&self) -> String {
        let vintage = self
            .vintage
            .map(|v| v.to_string())
            .unwrap_or_else(|| "nv".to_string());
        format!(
            "{}|{}|{}",
            normalize(&self.producer),
            normalize(&self.wine_name),
            vintage
        )
    }
}

// =============================================================================
// EXTRACTION TYPES
// =============================================================================

/// A single extracted field value with the extractor's confidence in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGuess<T> {
    pub value: T,
    pub confidence: Confidence,
}

impl<T> FieldGuess<T> {
    /// Create a field guess.
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            value,
            confidence: Confidence::new(confidence),
        }
    }
}

/// Structured field guesses produced by the external extractor.
///
/// Read-only input to the matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub producer: FieldGuess<String>,
    pub wine_name: FieldGuess<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage: Option<FieldGuess<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alcohol_percent: Option<FieldGuess<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottle_size: Option<FieldGuess<String>>,
}

impl ExtractedFields {
    /// Build fields from known-good values (confidence 1.0), as used for
    /// import rows where the text came from a spreadsheet, not a photo.
    pub fn certain(producer: impl Into<String>, wine_name: impl Into<String>) -> Self {
        Self {
            producer: FieldGuess::new(producer.into(), 1.0),
            wine_name: FieldGuess::new(wine_name.into(), 1.0),
            vintage: None,
            alcohol_percent: None,
            bottle_size: None,
        }
    }

    /// Set the vintage guess.
    pub fn with_vintage(mut self, vintage: i32, confidence: f64) -> Self {
        self.vintage = Some(FieldGuess::new(vintage, confidence));
        self
    }
}

/// Outcome of the extraction collaborator call.
///
/// Downstream matching code can only proceed on the `Extracted` arm, so it
/// can never accidentally run on partially-missing data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Extraction produced structured fields.
    Extracted { fields: ExtractedFields },
    /// Extraction ran but could not produce fields (unreadable label,
    /// model refusal). The user falls back to manual entry.
    Failed { reason: String },
}

// =============================================================================
// MATCH TYPES
// =============================================================================

/// The uncertain (producer, wine name, vintage) tuple scored against the
/// catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQuery {
    pub producer: String,
    pub wine_name: String,
    pub vintage: Option<i32>,
}

impl MatchQuery {
    /// Create a query without a vintage.
    pub fn new(producer: impl Into<String>, wine_name: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            wine_name: wine_name.into(),
            vintage: None,
        }
    }

    /// Set the vintage.
    pub fn with_vintage(mut self, vintage: i32) -> Self {
        self.vintage = Some(vintage);
        self
    }
}

impl From<&ExtractedFields> for MatchQuery {
    fn from(fields: &ExtractedFields) -> Self {
        Self {
            producer: fields.producer.value.clone(),
            wine_name: fields.wine_name.value.clone(),
            vintage: fields.vintage.as_ref().map(|g| g.value),
        }
    }
}

/// One ranked catalog candidate. Derived per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub catalog_id: Uuid,
    /// Combined weighted similarity score in `[0, 1]`.
    pub score: f64,
    /// Score plus vintage bonus, capped at 1.0.
    pub confidence: Confidence,
    pub vintage_matched: bool,
}

/// Coarse bucket derived from the top candidate's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExactMatch,
    LikelyMatch,
    NoMatch,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchTier::ExactMatch => "exact_match",
            MatchTier::LikelyMatch => "likely_match",
            MatchTier::NoMatch => "no_match",
        };
        write!(f, "{}", s)
    }
}

/// Ranked candidate list plus the tier of its top candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Sorted by confidence descending; equal confidence broken by vintage
    /// match first, then score.
    pub candidates: Vec<MatchCandidate>,
    pub tier: MatchTier,
}

impl MatchResult {
    /// An empty NO_MATCH result.
    pub fn no_match() -> Self {
        Self {
            candidates: Vec::new(),
            tier: MatchTier::NoMatch,
        }
    }

    /// The best candidate, if any survived admission.
    pub fn top(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }
}

// =============================================================================
// QUALITY TYPES
// =============================================================================

/// Numeric metrics computed by the quality gate, kept for diagnostics and
/// review payloads regardless of pass/fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub blur_variance: f64,
    pub brightness_mean: f64,
    pub brightness_std: f64,
    pub sharpness: f64,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
}

/// Verdict of the image quality gate. Created once per image, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub pass: bool,
    /// Human-readable failure reasons, one per failing check. Empty iff
    /// `pass` is true.
    pub reasons: Vec<String>,
    pub metrics: QualityMetrics,
}

impl QualityReport {
    /// Build a report from accumulated check failures.
    ///
    /// The only constructor; it is what enforces `pass == reasons.is_empty()`.
    pub fn from_checks(reasons: Vec<String>, metrics: QualityMetrics) -> Self {
        Self {
            pass: reasons.is_empty(),
            reasons,
            metrics,
        }
    }
}

// =============================================================================
// REVIEW TYPES
// =============================================================================

/// Payload handed to the human moderation queue.
///
/// Carries enough to reconstruct the full decision context without
/// re-running the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub extracted: ExtractedFields,
    pub candidates: Vec<MatchCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<QualityMetrics>,
    /// True when no candidate survived and this is a proposal to create a
    /// new catalog entity rather than a disambiguation prompt.
    pub new_entity_proposal: bool,
}

// =============================================================================
// BOTTLE STATUS
// =============================================================================

/// Ownership status of a cellar item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleStatus {
    Stored,
    Drank,
    Lost,
}

impl BottleStatus {
    /// Merge priority: `Stored > Drank > Lost`. If any row in a group says
    /// the bottle is stored, assume it is still owned.
    fn priority(self) -> u8 {
        match self {
            BottleStatus::Stored => 2,
            BottleStatus::Drank => 1,
            BottleStatus::Lost => 0,
        }
    }

    /// The higher-priority of two statuses.
    pub fn merge(self, other: BottleStatus) -> BottleStatus {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for BottleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BottleStatus::Stored => "stored",
            BottleStatus::Drank => "drank",
            BottleStatus::Lost => "lost",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BottleStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stored" | "cellared" | "owned" => Ok(BottleStatus::Stored),
            "drank" | "drunk" | "consumed" => Ok(BottleStatus::Drank),
            "lost" | "missing" | "gone" => Ok(BottleStatus::Lost),
            other => Err(crate::error::Error::InvalidInput(format!(
                "Unknown bottle status: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_key_normalizes_identity_fields() {
        let a = UpsertEntry::new("Château Margaux", "Margaux").with_vintage(Some(2015));
        let b = UpsertEntry::new("chateau  margaux", "MARGAUX").with_vintage(Some(2015));
        assert_eq!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn test_natural_key_distinguishes_vintage() {
        let a = UpsertEntry::new("Margaux", "Margaux").with_vintage(Some(2015));
        let b = UpsertEntry::new("Margaux", "Margaux").with_vintage(Some(2016));
        let nv = UpsertEntry::new("Margaux", "Margaux");
        assert_ne!(a.natural_key(), b.natural_key());
        assert!(nv.natural_key().ends_with("|nv"));
    }

    #[test]
    fn test_quality_report_pass_iff_no_reasons() {
        let metrics = QualityMetrics {
            blur_variance: 500.0,
            brightness_mean: 120.0,
            brightness_std: 40.0,
            sharpness: 25.0,
            width: 1200,
            height: 1600,
            byte_size: 200_000,
        };
        let ok = QualityReport::from_checks(Vec::new(), metrics.clone());
        assert!(ok.pass);

        let bad = QualityReport::from_checks(vec!["too dark".into()], metrics);
        assert!(!bad.pass);
        assert_eq!(bad.reasons.len(), 1);
    }

    #[test]
    fn test_match_query_from_extracted_fields() {
        let fields =
            ExtractedFields::certain("Penfolds", "Grange").with_vintage(2010, 0.9);
        let query = MatchQuery::from(&fields);
        assert_eq!(query.producer, "Penfolds");
        assert_eq!(query.wine_name, "Grange");
        assert_eq!(query.vintage, Some(2010));
    }

    #[test]
    fn test_extraction_outcome_serde_tag() {
        let failed = ExtractionOutcome::Failed {
            reason: "label unreadable".into(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");

        let extracted = ExtractionOutcome::Extracted {
            fields: ExtractedFields::certain("A", "B"),
        };
        let json = serde_json::to_value(&extracted).unwrap();
        assert_eq!(json["status"], "extracted");
    }

    #[test]
    fn test_match_result_no_match_is_empty() {
        let result = MatchResult::no_match();
        assert!(result.candidates.is_empty());
        assert_eq!(result.tier, MatchTier::NoMatch);
        assert!(result.top().is_none());
    }

    #[test]
    fn test_bottle_status_merge_priority() {
        assert_eq!(
            BottleStatus::Lost.merge(BottleStatus::Stored),
            BottleStatus::Stored
        );
        assert_eq!(
            BottleStatus::Stored.merge(BottleStatus::Drank),
            BottleStatus::Stored
        );
        assert_eq!(
            BottleStatus::Drank.merge(BottleStatus::Lost),
            BottleStatus::Drank
        );
    }

    #[test]
    fn test_bottle_status_from_str_tolerant() {
        use std::str::FromStr;
        assert_eq!(
            BottleStatus::from_str(" Stored ").unwrap(),
            BottleStatus::Stored
        );
        assert_eq!(
            BottleStatus::from_str("drunk").unwrap(),
            BottleStatus::Drank
        );
        assert!(BottleStatus::from_str("teleported").is_err());
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(MatchTier::ExactMatch.to_string(), "exact_match");
        assert_eq!(MatchTier::LikelyMatch.to_string(), "likely_match");
        assert_eq!(MatchTier::NoMatch.to_string(), "no_match");
    }
}
