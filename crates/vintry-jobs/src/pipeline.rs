//! The stage-sequenced resolution pipeline.
//!
//! Drives one input through quality-check → extraction (external) →
//! matching → confidence routing → terminal decision. Stages within a job
//! run strictly sequentially; collaborators are injected traits so the
//! whole pipeline runs against in-memory fakes in tests.
//!
//! Failure semantics: QC and extraction failures terminate only this job
//! (the caller retakes the photo or falls back to manual entry); catalog
//! read errors degrade to NO_MATCH, and a failed commit degrades to a
//! review item; a missed match is recoverable by a human, a crashed
//! pipeline is not.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use vintry_core::models::{
    ExtractedFields, ExtractionOutcome, MatchQuery, MatchResult, MatchTier, ReviewPayload,
    UpsertEntry,
};
use vintry_core::{
    defaults, ingest, CatalogReader, CatalogWriter, FieldExtractor, Result, ReviewSink,
};
use vintry_match::{match_entries, MatcherConfig};
use vintry_vision::{evaluate, ImageBuffer, QcConfig};

use crate::state::{ResolutionJob, ResolutionOutcome, ResolutionStage};

/// Confidence-gated routing policy.
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    /// Minimum confidence for committing without a human in the loop.
    pub auto_commit_confidence: f64,
    /// Commit the top candidate of a LIKELY_MATCH instead of routing it to
    /// review. Off by default; ambiguous matches go to a human.
    pub accept_likely: bool,
    /// Permit handing NO_MATCH cases to the external enrichment lookup.
    pub allow_ai_search: bool,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            auto_commit_confidence: defaults::AUTO_COMMIT_CONFIDENCE,
            accept_likely: false,
            allow_ai_search: false,
        }
    }
}

impl RoutingPolicy {
    /// Set the auto-commit confidence floor.
    pub fn with_auto_commit_confidence(mut self, confidence: f64) -> Self {
        self.auto_commit_confidence = confidence;
        self
    }

    /// Accept likely matches without review.
    pub fn with_accept_likely(mut self, accept: bool) -> Self {
        self.accept_likely = accept;
        self
    }

    /// Permit the enrichment fallback for no-match cases.
    pub fn with_allow_ai_search(mut self, allow: bool) -> Self {
        self.allow_ai_search = allow;
        self
    }
}

/// Where routing sends a match result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Commit to this catalog entity.
    Commit { catalog_id: Uuid },
    /// Queue for human review; `new_entity` marks a creation proposal
    /// rather than a disambiguation prompt.
    Review { new_entity: bool },
    /// Hand to the external enrichment lookup.
    AiSearch,
}

/// Route a match result. Pure function of the result and the policy.
pub fn route(result: &MatchResult, policy: &RoutingPolicy) -> RouteDecision {
    match (result.tier, result.top()) {
        (MatchTier::ExactMatch, Some(top)) => {
            if top.confidence.at_least(policy.auto_commit_confidence) || policy.accept_likely {
                RouteDecision::Commit {
                    catalog_id: top.catalog_id,
                }
            } else {
                RouteDecision::Review { new_entity: false }
            }
        }
        (MatchTier::LikelyMatch, Some(top)) => {
            if policy.accept_likely {
                RouteDecision::Commit {
                    catalog_id: top.catalog_id,
                }
            } else {
                RouteDecision::Review { new_entity: false }
            }
        }
        _ => {
            if policy.allow_ai_search {
                RouteDecision::AiSearch
            } else {
                RouteDecision::Review { new_entity: true }
            }
        }
    }
}

/// The resolution pipeline over injected collaborators.
pub struct ResolutionPipeline {
    extractor: Arc<dyn FieldExtractor>,
    catalog: Arc<dyn CatalogReader>,
    writer: Arc<dyn CatalogWriter>,
    /// Optional moderation queue; review payloads are still carried on the
    /// job outcome either way.
    review_sink: Option<Arc<dyn ReviewSink>>,
    qc: QcConfig,
    matcher: MatcherConfig,
    policy: RoutingPolicy,
    extraction_timeout: Duration,
    max_upload_bytes: u64,
}

impl ResolutionPipeline {
    /// Create a pipeline with default configs.
    pub fn new(
        extractor: Arc<dyn FieldExtractor>,
        catalog: Arc<dyn CatalogReader>,
        writer: Arc<dyn CatalogWriter>,
    ) -> Self {
        Self {
            extractor,
            catalog,
            writer,
            review_sink: None,
            qc: QcConfig::default(),
            matcher: MatcherConfig::default(),
            policy: RoutingPolicy::default(),
            extraction_timeout: Duration::from_secs(defaults::EXTRACTION_TIMEOUT_SECS),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }

    /// Override the quality gate config.
    pub fn with_qc_config(mut self, qc: QcConfig) -> Self {
        self.qc = qc;
        self
    }

    /// Override the matcher config.
    pub fn with_matcher_config(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    /// Override the routing policy.
    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the extraction time bound.
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Attach a moderation queue for pending-review payloads.
    pub fn with_review_sink(mut self, sink: Arc<dyn ReviewSink>) -> Self {
        self.review_sink = Some(sink);
        self
    }

    /// Resolve a photographed label from its upload bytes.
    pub async fn resolve_label_scan(
        &self,
        bytes: &[u8],
        claimed_mime: &str,
    ) -> Result<ResolutionJob> {
        let start = Instant::now();

        let validation =
            ingest::validate_image("upload", bytes, claimed_mime, self.max_upload_bytes);
        if !validation.allowed {
            return Err(vintry_core::Error::Ingest(
                validation
                    .reject_reason
                    .unwrap_or_else(|| "Upload rejected".to_string()),
            ));
        }
        let mime = validation
            .detected_mime
            .unwrap_or_else(|| claimed_mime.to_string());

        let mut job = ResolutionJob::label_scan(ingest::content_hash(bytes), mime.clone());

        // Quality gate.
        job.advance(ResolutionStage::QcRunning)?;
        let buffer = ImageBuffer::decode(bytes)?;
        let report = evaluate(&buffer, &self.qc);
        let passed = report.pass;
        let reasons = report.reasons.clone();
        job.quality = Some(report);
        if !passed {
            job.advance(ResolutionStage::QcFailed)?;
            job.outcome = Some(ResolutionOutcome::QcRejected { reasons });
            info!(
                job_id = %job.id,
                stage = %job.stage(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Photo rejected by quality gate"
            );
            return Ok(job);
        }
        job.advance(ResolutionStage::QcPassed)?;

        // Extraction, time-bounded. A timeout is an extraction failure,
        // never a hang.
        job.advance(ResolutionStage::ExtractionRunning)?;
        let extraction =
            match tokio::time::timeout(self.extraction_timeout, self.extractor.extract(bytes, &mime))
                .await
            {
                Err(_) => Err(format!(
                    "Extraction timed out after {}s",
                    self.extraction_timeout.as_secs()
                )),
                Ok(Err(e)) => Err(e.to_string()),
                Ok(Ok(ExtractionOutcome::Failed { reason })) => Err(reason),
                Ok(Ok(ExtractionOutcome::Extracted { fields })) => Ok(fields),
            };

        let fields = match extraction {
            Ok(fields) => fields,
            Err(reason) => {
                job.advance(ResolutionStage::ExtractionFailed)?;
                job.outcome = Some(ResolutionOutcome::ExtractionFailed {
                    reason: reason.clone(),
                });
                warn!(
                    job_id = %job.id,
                    error = %reason,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Extraction failed; falling back to manual entry"
                );
                return Ok(job);
            }
        };
        job.extracted = Some(fields.clone());
        job.advance(ResolutionStage::ExtractionDone)?;

        self.match_and_route(job, fields, start).await
    }

    /// Resolve already-structured fields (the bulk-import row flow).
    pub async fn resolve_fields(
        &self,
        row_number: usize,
        fields: ExtractedFields,
    ) -> Result<ResolutionJob> {
        let start = Instant::now();
        let mut job = ResolutionJob::import_row(row_number);
        job.extracted = Some(fields.clone());
        self.match_and_route(job, fields, start).await
    }

    async fn match_and_route(
        &self,
        mut job: ResolutionJob,
        fields: ExtractedFields,
        start: Instant,
    ) -> Result<ResolutionJob> {
        job.advance(ResolutionStage::MatchingRunning)?;

        let query = MatchQuery::from(&fields);
        // A missed match is recoverable via review; a failed job is not.
        let pool = match self.catalog.search(&query.producer).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!(
                    job_id = %job.id,
                    error = %e,
                    "Catalog search failed; degrading to no-match"
                );
                Vec::new()
            }
        };

        let result = match_entries(&query, &pool, &self.matcher);
        job.advance(if result.tier == MatchTier::NoMatch {
            ResolutionStage::NoMatch
        } else {
            ResolutionStage::Matched
        })?;
        job.match_result = Some(result.clone());

        job.advance(ResolutionStage::Routing)?;
        let decision = route(&result, &self.policy);

        match decision {
            RouteDecision::Commit { catalog_id } => {
                match self.commit(catalog_id, &pool, &fields).await {
                    Ok(committed_id) => {
                        job.advance(ResolutionStage::AutoCommitted)?;
                        job.outcome = Some(ResolutionOutcome::AutoCommitted {
                            catalog_id: committed_id,
                        });
                    }
                    Err(e) => {
                        // Degrade a failed write to a review item.
                        warn!(
                            job_id = %job.id,
                            catalog_id = %catalog_id,
                            error = %e,
                            "Commit failed; routing to review instead"
                        );
                        self.finish_pending_review(&mut job, &fields, &result, false)
                            .await?;
                    }
                }
            }
            RouteDecision::Review { new_entity } => {
                self.finish_pending_review(&mut job, &fields, &result, new_entity)
                    .await?;
            }
            RouteDecision::AiSearch => {
                job.advance(ResolutionStage::AiSearchFallback)?;
                job.outcome = Some(ResolutionOutcome::AiSearchFallback {
                    query: query.clone(),
                });
            }
        }

        info!(
            job_id = %job.id,
            stage = %job.stage(),
            tier = %result.tier,
            candidate_count = result.candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Resolution complete"
        );
        Ok(job)
    }

    /// Commit a matched entity: upsert with the matched entry's identity so
    /// the write converges on the existing record, attaching the extracted
    /// data as the item payload.
    async fn commit(
        &self,
        catalog_id: Uuid,
        pool: &[vintry_core::models::CatalogEntry],
        fields: &ExtractedFields,
    ) -> Result<Uuid> {
        let matched = pool
            .iter()
            .find(|e| e.id == catalog_id)
            .ok_or_else(|| {
                vintry_core::Error::Catalog(format!(
                    "Matched entry {} missing from snapshot",
                    catalog_id
                ))
            })?;

        let entry = UpsertEntry::new(&matched.producer, &matched.wine_name)
            .with_vintage(matched.vintage)
            .with_item(serde_json::to_value(fields)?);
        self.writer.upsert(entry).await
    }

    /// Terminate the job at PendingReview, handing the payload to the
    /// moderation queue when one is attached. A sink failure only loses the
    /// push; the payload stays on the job outcome.
    async fn finish_pending_review(
        &self,
        job: &mut ResolutionJob,
        fields: &ExtractedFields,
        result: &MatchResult,
        new_entity: bool,
    ) -> Result<()> {
        job.advance(ResolutionStage::PendingReview)?;
        let payload = ReviewPayload {
            extracted: fields.clone(),
            candidates: result.candidates.clone(),
            quality_metrics: job.quality.as_ref().map(|q| q.metrics.clone()),
            new_entity_proposal: new_entity,
        };
        if let Some(sink) = &self.review_sink {
            if let Err(e) = sink.enqueue(payload.clone()).await {
                warn!(
                    job_id = %job.id,
                    error = %e,
                    "Review sink unavailable; payload retained on job"
                );
            }
        }
        job.outcome = Some(ResolutionOutcome::PendingReview { payload });
        Ok(())
    }
}
