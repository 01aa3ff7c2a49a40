//! The resolution state machine.
//!
//! The original system scattered status strings across storage writes;
//! here the stage is an explicit enum, the transition table is code, and
//! [`ResolutionJob::advance`] is the single mutator; an illegal transition
//! is an `Error::IllegalTransition`, not a silent data corruption. This is
//! what makes the retry/fallback guarantees verifiable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vintry_core::models::{
    ExtractedFields, MatchQuery, MatchResult, QualityReport, ReviewPayload,
};
use vintry_core::{Error, Result};

/// Stage of a resolution job.
///
/// Image-sourced jobs walk the full machine; row-sourced jobs enter at
/// `MatchingRunning` (their text came from a spreadsheet, there is nothing
/// to photograph or extract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    Created,
    QcRunning,
    QcFailed,
    QcPassed,
    ExtractionRunning,
    ExtractionFailed,
    ExtractionDone,
    MatchingRunning,
    Matched,
    NoMatch,
    Routing,
    AutoCommitted,
    PendingReview,
    AiSearchFallback,
}

impl ResolutionStage {
    /// Whether this stage ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionStage::QcFailed
                | ResolutionStage::ExtractionFailed
                | ResolutionStage::AutoCommitted
                | ResolutionStage::PendingReview
                | ResolutionStage::AiSearchFallback
        )
    }

    /// Whether the machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: ResolutionStage) -> bool {
        use ResolutionStage::*;
        match self {
            Created => matches!(next, QcRunning | MatchingRunning),
            QcRunning => matches!(next, QcFailed | QcPassed),
            QcPassed => matches!(next, ExtractionRunning),
            ExtractionRunning => matches!(next, ExtractionFailed | ExtractionDone),
            ExtractionDone => matches!(next, MatchingRunning),
            MatchingRunning => matches!(next, Matched | NoMatch),
            Matched | NoMatch => matches!(next, Routing),
            Routing => matches!(next, AutoCommitted | PendingReview | AiSearchFallback),
            // Terminal stages go nowhere.
            QcFailed | ExtractionFailed | AutoCommitted | PendingReview | AiSearchFallback => {
                false
            }
        }
    }
}

impl std::fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolutionStage::Created => "created",
            ResolutionStage::QcRunning => "qc_running",
            ResolutionStage::QcFailed => "qc_failed",
            ResolutionStage::QcPassed => "qc_passed",
            ResolutionStage::ExtractionRunning => "extraction_running",
            ResolutionStage::ExtractionFailed => "extraction_failed",
            ResolutionStage::ExtractionDone => "extraction_done",
            ResolutionStage::MatchingRunning => "matching_running",
            ResolutionStage::Matched => "matched",
            ResolutionStage::NoMatch => "no_match",
            ResolutionStage::Routing => "routing",
            ResolutionStage::AutoCommitted => "auto_committed",
            ResolutionStage::PendingReview => "pending_review",
            ResolutionStage::AiSearchFallback => "ai_search_fallback",
        };
        write!(f, "{}", s)
    }
}

/// What produced this job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSource {
    /// A photographed label, identified by its content hash for idempotent
    /// retries of the same upload.
    LabelScan {
        content_hash: String,
        mime_type: String,
    },
    /// One row of a bulk import.
    ImportRow { row_number: usize },
}

/// Terminal result of a resolution job, carrying the decision context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Committed to the catalog without a human in the loop.
    AutoCommitted { catalog_id: Uuid },
    /// Routed to the moderation queue.
    PendingReview { payload: ReviewPayload },
    /// Handed to the external enrichment lookup.
    AiSearchFallback { query: MatchQuery },
    /// The photo failed the quality gate; the user should retake it.
    QcRejected { reasons: Vec<String> },
    /// Extraction failed or timed out; the user falls back to manual entry.
    ExtractionFailed { reason: String },
}

/// The state-machine instance for one input.
///
/// Holds everything the stages produce; archived (dropped by the caller) on
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionJob {
    pub id: Uuid,
    pub source: JobSource,
    stage: ResolutionStage,
    pub quality: Option<QualityReport>,
    pub extracted: Option<ExtractedFields>,
    pub match_result: Option<MatchResult>,
    pub outcome: Option<ResolutionOutcome>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResolutionJob {
    fn new(source: JobSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            stage: ResolutionStage::Created,
            quality: None,
            extracted: None,
            match_result: None,
            outcome: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Create a job for a photographed label.
    pub fn label_scan(content_hash: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::new(JobSource::LabelScan {
            content_hash: content_hash.into(),
            mime_type: mime_type.into(),
        })
    }

    /// Create a job for one bulk-import row.
    pub fn import_row(row_number: usize) -> Self {
        Self::new(JobSource::ImportRow { row_number })
    }

    /// Current stage.
    pub fn stage(&self) -> ResolutionStage {
        self.stage
    }

    /// Move to the next stage, rejecting transitions the machine forbids.
    ///
    /// The only stage mutator. Reaching a terminal stage stamps
    /// `completed_at`.
    pub fn advance(&mut self, next: ResolutionStage) -> Result<()> {
        if !self.stage.can_transition_to(next) {
            return Err(Error::IllegalTransition {
                from: self.stage.to_string(),
                to: next.to_string(),
            });
        }
        self.stage = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_flow_happy_path() {
        use ResolutionStage::*;
        let mut job = ResolutionJob::label_scan("hash", "image/jpeg");
        for stage in [
            QcRunning,
            QcPassed,
            ExtractionRunning,
            ExtractionDone,
            MatchingRunning,
            Matched,
            Routing,
            AutoCommitted,
        ] {
            job.advance(stage).unwrap();
        }
        assert_eq!(job.stage(), AutoCommitted);
        assert!(job.stage().is_terminal());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_row_flow_skips_image_stages() {
        use ResolutionStage::*;
        let mut job = ResolutionJob::import_row(3);
        job.advance(MatchingRunning).unwrap();
        job.advance(NoMatch).unwrap();
        job.advance(Routing).unwrap();
        job.advance(PendingReview).unwrap();
        assert!(job.stage().is_terminal());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        use ResolutionStage::*;
        let mut job = ResolutionJob::label_scan("hash", "image/jpeg");
        let err = job.advance(AutoCommitted).unwrap_err();
        assert!(matches!(err, Error::IllegalTransition { .. }));
        // Stage unchanged after the rejected advance.
        assert_eq!(job.stage(), Created);
    }

    #[test]
    fn test_terminal_stages_go_nowhere() {
        use ResolutionStage::*;
        for terminal in [
            QcFailed,
            ExtractionFailed,
            AutoCommitted,
            PendingReview,
            AiSearchFallback,
        ] {
            for next in [
                Created,
                QcRunning,
                QcPassed,
                ExtractionRunning,
                ExtractionDone,
                MatchingRunning,
                Matched,
                NoMatch,
                Routing,
                AutoCommitted,
                PendingReview,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be illegal",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_qc_cannot_be_skipped_on_image_flow() {
        use ResolutionStage::*;
        let mut job = ResolutionJob::label_scan("hash", "image/jpeg");
        job.advance(QcRunning).unwrap();
        // Straight to extraction without a QC verdict is illegal.
        assert!(job.advance(ExtractionRunning).is_err());
    }

    #[test]
    fn test_qc_failure_is_terminal() {
        use ResolutionStage::*;
        let mut job = ResolutionJob::label_scan("hash", "image/jpeg");
        job.advance(QcRunning).unwrap();
        job.advance(QcFailed).unwrap();
        assert!(job.stage().is_terminal());
        assert!(job.advance(QcPassed).is_err());
    }

    #[test]
    fn test_stage_display_snake_case() {
        assert_eq!(ResolutionStage::QcRunning.to_string(), "qc_running");
        assert_eq!(
            ResolutionStage::AiSearchFallback.to_string(),
            "ai_search_fallback"
        );
    }

    #[test]
    fn test_job_serde_round_trip() {
        let job = ResolutionJob::import_row(7);
        let json = serde_json::to_string(&job).unwrap();
        let back: ResolutionJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.stage(), ResolutionStage::Created);
    }
}
