//! End-to-end pipeline behavior over in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use vintry_core::catalog::MemoryCatalog;
use vintry_core::models::{
    CatalogEntry, ExtractedFields, ExtractionOutcome,
};
use vintry_core::{CatalogReader, Error, FieldExtractor, Result};
use vintry_jobs::{
    ResolutionInput, ResolutionOutcome, ResolutionPipeline, ResolutionRequest, ResolutionStage,
    ResolutionWorker, RoutingPolicy, WorkerConfig, WorkerEvent,
};

/// Extractor stub returning a fixed outcome, optionally after a delay.
struct StubExtractor {
    outcome: ExtractionOutcome,
    delay: Option<Duration>,
}

impl StubExtractor {
    fn extracting(fields: ExtractedFields) -> Self {
        Self {
            outcome: ExtractionOutcome::Extracted { fields },
            delay: None,
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            outcome: ExtractionOutcome::Failed {
                reason: reason.to_string(),
            },
            delay: None,
        }
    }

    fn slow(fields: ExtractedFields, delay: Duration) -> Self {
        Self {
            outcome: ExtractionOutcome::Extracted { fields },
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl FieldExtractor for StubExtractor {
    async fn extract(&self, _bytes: &[u8], _mime_type: &str) -> Result<ExtractionOutcome> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.outcome.clone())
    }
}

/// Catalog reader whose search always fails.
struct UnavailableCatalog;

#[async_trait]
impl CatalogReader for UnavailableCatalog {
    async fn search(&self, _text: &str) -> Result<Vec<CatalogEntry>> {
        Err(Error::Catalog("store unavailable".into()))
    }

    async fn snapshot(&self) -> Result<Vec<CatalogEntry>> {
        Err(Error::Catalog("store unavailable".into()))
    }
}

/// Deterministic pseudo-random greyscale plane (LCG).
fn noise_plane(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..width as usize * height as usize)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

/// Encode a greyscale plane as real PNG upload bytes.
fn encode_png(width: u32, height: u32, luma: Vec<u8>) -> Vec<u8> {
    let img = image::GrayImage::from_raw(width, height, luma).unwrap();
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

/// A textured 600x600 capture that clears the quality gate.
fn good_photo() -> Vec<u8> {
    encode_png(600, 600, noise_plane(600, 600, 11))
}

fn margaux_catalog() -> Arc<MemoryCatalog> {
    Arc::new(MemoryCatalog::with_entries(vec![
        CatalogEntry::new("Château Margaux", "Château Margaux").with_vintage(2015),
        CatalogEntry::new("Penfolds", "Grange").with_vintage(2010),
    ]))
}

fn margaux_fields() -> ExtractedFields {
    ExtractedFields::certain("Château Margaux", "Château Margaux").with_vintage(2015, 0.95)
}

#[tokio::test]
async fn label_scan_auto_commits_exact_match() {
    let catalog = margaux_catalog();
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::extracting(margaux_fields())),
        catalog.clone(),
        catalog.clone(),
    );

    let job = pipeline
        .resolve_label_scan(&good_photo(), "image/png")
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::AutoCommitted);
    assert!(job.quality.as_ref().unwrap().pass);

    let result = job.match_result.as_ref().unwrap();
    assert_eq!(result.top().unwrap().confidence.value(), 1.0);
    assert!(result.top().unwrap().vintage_matched);

    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::AutoCommitted { catalog_id } => {
            // Committed to the existing entity, not a duplicate.
            assert_eq!(*catalog_id, result.top().unwrap().catalog_id);
            assert_eq!(catalog.len().await, 2);
            // The item payload carries the extracted fields.
            assert!(catalog.item_for(*catalog_id).await.is_some());
        }
        other => panic!("expected AutoCommitted, got {:?}", other),
    }
}

#[tokio::test]
async fn unusable_photo_terminates_at_qc_with_reasons() {
    let catalog = margaux_catalog();
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::extracting(margaux_fields())),
        catalog.clone(),
        catalog,
    );

    // Tiny flat capture: undersized, low-resolution, no detail.
    let bad = encode_png(100, 100, vec![128; 100 * 100]);
    let job = pipeline.resolve_label_scan(&bad, "image/png").await.unwrap();

    assert_eq!(job.stage(), ResolutionStage::QcFailed);
    assert!(job.extracted.is_none(), "extraction must not run after QC failure");
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::QcRejected { reasons } => assert!(!reasons.is_empty()),
        other => panic!("expected QcRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn extraction_failure_falls_back_to_manual_entry() {
    let catalog = margaux_catalog();
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::failing("label unreadable")),
        catalog.clone(),
        catalog,
    );

    let job = pipeline
        .resolve_label_scan(&good_photo(), "image/png")
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::ExtractionFailed);
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::ExtractionFailed { reason } => {
            assert_eq!(reason, "label unreadable");
        }
        other => panic!("expected ExtractionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn extraction_timeout_is_treated_as_failure() {
    let catalog = margaux_catalog();
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::slow(
            margaux_fields(),
            Duration::from_millis(200),
        )),
        catalog.clone(),
        catalog,
    )
    .with_extraction_timeout(Duration::from_millis(10));

    let job = pipeline
        .resolve_label_scan(&good_photo(), "image/png")
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::ExtractionFailed);
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::ExtractionFailed { reason } => {
            assert!(reason.contains("timed out"), "reason: {}", reason);
        }
        other => panic!("expected ExtractionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn catalog_outage_degrades_to_review_not_crash() {
    let writer = Arc::new(MemoryCatalog::new());
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::extracting(margaux_fields())),
        Arc::new(UnavailableCatalog),
        writer,
    );

    let job = pipeline
        .resolve_label_scan(&good_photo(), "image/png")
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::PendingReview);
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::PendingReview { payload } => {
            assert!(payload.candidates.is_empty());
            assert!(payload.new_entity_proposal);
            assert!(payload.quality_metrics.is_some());
        }
        other => panic!("expected PendingReview, got {:?}", other),
    }
}

#[tokio::test]
async fn non_image_upload_is_rejected_at_ingestion() {
    let catalog = margaux_catalog();
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::extracting(margaux_fields())),
        catalog.clone(),
        catalog,
    );

    let err = pipeline
        .resolve_label_scan(b"%PDF-1.7 not a photo", "image/jpeg")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Ingest(_)));
}

#[tokio::test]
async fn row_fields_below_threshold_route_to_new_entity_review() {
    // Combined score ~0.60 against the default 0.70 threshold: the entry
    // is in the searched pool but the admission filter discards it.
    let catalog = Arc::new(MemoryCatalog::with_entries(vec![CatalogEntry::new(
        "abcdx", "abde",
    )]));
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::failing("unused")),
        catalog.clone(),
        catalog,
    );

    let job = pipeline
        .resolve_fields(1, ExtractedFields::certain("abcd", "abcd"))
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::PendingReview);
    let result = job.match_result.as_ref().unwrap();
    assert!(result.candidates.is_empty());
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::PendingReview { payload } => {
            assert!(payload.new_entity_proposal);
            // Row flow never saw a photo.
            assert!(payload.quality_metrics.is_none());
        }
        other => panic!("expected PendingReview, got {:?}", other),
    }
}

#[tokio::test]
async fn likely_match_commits_only_when_policy_accepts() {
    // Identical producer, partly different name: likely tier.
    let entry = CatalogEntry::new("Penfolds", "Grange Shiraz 2010");
    let entry_id = entry.id;
    let catalog = Arc::new(MemoryCatalog::with_entries(vec![entry]));
    let fields = ExtractedFields::certain("Penfolds", "Grange");

    let reviewing = ResolutionPipeline::new(
        Arc::new(StubExtractor::failing("unused")),
        catalog.clone(),
        catalog.clone(),
    );
    let job = reviewing.resolve_fields(1, fields.clone()).await.unwrap();
    assert_eq!(job.stage(), ResolutionStage::PendingReview);

    let accepting = ResolutionPipeline::new(
        Arc::new(StubExtractor::failing("unused")),
        catalog.clone(),
        catalog,
    )
    .with_policy(RoutingPolicy::default().with_accept_likely(true));
    let job = accepting.resolve_fields(1, fields).await.unwrap();
    assert_eq!(job.stage(), ResolutionStage::AutoCommitted);
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::AutoCommitted { catalog_id } => assert_eq!(*catalog_id, entry_id),
        other => panic!("expected AutoCommitted, got {:?}", other),
    }
}

#[tokio::test]
async fn pending_review_payload_reaches_the_moderation_queue() {
    use vintry_core::catalog::MemoryReviewSink;

    let catalog = Arc::new(MemoryCatalog::new());
    let sink = Arc::new(MemoryReviewSink::new());
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::failing("unused")),
        catalog.clone(),
        catalog,
    )
    .with_review_sink(sink.clone());

    let job = pipeline
        .resolve_fields(1, ExtractedFields::certain("Unknown", "Wine"))
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::PendingReview);
    let queued = sink.drain().await;
    assert_eq!(queued.len(), 1);
    assert!(queued[0].new_entity_proposal);
    assert_eq!(queued[0].extracted.producer.value, "Unknown");
}

#[tokio::test]
async fn no_match_uses_ai_search_when_permitted() {
    let catalog = Arc::new(MemoryCatalog::new());
    let pipeline = ResolutionPipeline::new(
        Arc::new(StubExtractor::failing("unused")),
        catalog.clone(),
        catalog,
    )
    .with_policy(RoutingPolicy::default().with_allow_ai_search(true));

    let job = pipeline
        .resolve_fields(1, ExtractedFields::certain("Unknown", "Wine"))
        .await
        .unwrap();

    assert_eq!(job.stage(), ResolutionStage::AiSearchFallback);
    match job.outcome.as_ref().unwrap() {
        ResolutionOutcome::AiSearchFallback { query } => {
            assert_eq!(query.producer, "Unknown");
        }
        other => panic!("expected AiSearchFallback, got {:?}", other),
    }
}

#[tokio::test]
async fn worker_processes_queued_jobs_and_shuts_down() {
    let catalog = margaux_catalog();
    let pipeline = Arc::new(ResolutionPipeline::new(
        Arc::new(StubExtractor::extracting(margaux_fields())),
        catalog.clone(),
        catalog,
    ));

    let worker = ResolutionWorker::new(
        pipeline,
        WorkerConfig::default().with_max_concurrent(2),
    );
    let handle = worker.start();
    let mut events = handle.events();

    for row in 0..3 {
        handle
            .submit(ResolutionRequest::new(ResolutionInput::Fields {
                row_number: row,
                fields: margaux_fields(),
            }))
            .await
            .unwrap();
    }

    let mut completed = 0;
    while completed < 3 {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("worker stalled")
            .unwrap();
        if let WorkerEvent::JobCompleted { stage, .. } = event {
            assert_eq!(stage, ResolutionStage::AutoCommitted);
            completed += 1;
        }
    }

    handle.shutdown().await.unwrap();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no stop event")
            .unwrap();
        if matches!(event, WorkerEvent::WorkerStopped) {
            break;
        }
    }
}
