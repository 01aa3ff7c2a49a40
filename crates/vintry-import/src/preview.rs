//! Bulk-import preview and commit.
//!
//! The preview resolves every row against a catalog snapshot and reports
//! per-row tiers plus batch stats before any write occurs; the preview is
//! the human checkpoint for the batch. Commit then creates one entity per
//! unmatched row and one aggregated upsert per matched group, all through
//! the idempotent `CatalogWriter`, so a retried commit converges instead of
//! duplicating.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vintry_core::models::{CatalogEntry, MatchCandidate, MatchQuery, MatchTier, UpsertEntry};
use vintry_core::{CatalogWriter, Result};
use vintry_match::{match_entries, MatcherConfig};

use crate::aggregate::aggregate;
use crate::row::{ImportRow, RawRow};

/// Options for resolving a batch.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub matcher: MatcherConfig,
    /// Link likely matches to their top candidate. On by default: the
    /// preview itself is the review step for a bulk import, unlike the
    /// single-photo flow where likely matches go to a moderation queue.
    pub accept_likely: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            accept_likely: true,
        }
    }
}

impl ImportOptions {
    /// Toggle linking of likely matches.
    pub fn with_accept_likely(mut self, accept: bool) -> Self {
        self.accept_likely = accept;
        self
    }
}

/// Per-row preview entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    pub row_number: usize,
    /// The parsed row, `matched_catalog_id` filled where a match was
    /// accepted. `None` when the row failed validation.
    pub row: Option<ImportRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<MatchTier>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub candidates: Vec<MatchCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch statistics shown before commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub total: usize,
    pub exact_matches: usize,
    pub likely_matches: usize,
    pub no_matches: usize,
    pub errors: usize,
}

/// The preview response: stats plus per-row resolution, no writes yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreview {
    pub stats: ImportStats,
    pub rows: Vec<PreviewRow>,
}

/// The commit response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCommitOutcome {
    /// New catalog entities created, one per unmatched row.
    pub inserted_entities: usize,
    /// Aggregated item upserts, one per matched group.
    pub upserted_items: usize,
    /// Total bottle quantity committed.
    pub total_quantity: u32,
    /// Rows present in the preview but not committed (likely matches when
    /// `accept_likely` was off).
    pub skipped_rows: usize,
    /// Rows excluded by validation or failed writes.
    pub error_rows: usize,
}

/// Resolve a batch of raw rows against a catalog snapshot.
///
/// Row errors never abort siblings; each failed row is reported in place.
pub fn preview(
    raw_rows: &[RawRow],
    catalog: &[CatalogEntry],
    options: &ImportOptions,
) -> ImportPreview {
    let mut stats = ImportStats {
        total: raw_rows.len(),
        ..ImportStats::default()
    };
    let mut rows = Vec::with_capacity(raw_rows.len());

    for (index, raw) in raw_rows.iter().enumerate() {
        let row_number = index + 1;
        match ImportRow::parse(row_number, raw) {
            Err(error) => {
                stats.errors += 1;
                rows.push(PreviewRow {
                    row_number,
                    row: None,
                    tier: None,
                    candidates: Vec::new(),
                    error: Some(error.reason),
                });
            }
            Ok(mut row) => {
                let query = MatchQuery {
                    producer: row.producer.clone(),
                    wine_name: row.wine_name.clone(),
                    vintage: row.vintage,
                };
                let result = match_entries(&query, catalog, &options.matcher);

                match result.tier {
                    MatchTier::ExactMatch => {
                        stats.exact_matches += 1;
                        row.matched_catalog_id = result.top().map(|c| c.catalog_id);
                    }
                    MatchTier::LikelyMatch => {
                        stats.likely_matches += 1;
                        if options.accept_likely {
                            row.matched_catalog_id = result.top().map(|c| c.catalog_id);
                        }
                    }
                    MatchTier::NoMatch => {
                        stats.no_matches += 1;
                    }
                }

                rows.push(PreviewRow {
                    row_number,
                    row: Some(row),
                    tier: Some(result.tier),
                    candidates: result.candidates,
                    error: None,
                });
            }
        }
    }

    info!(
        subsystem = "import",
        total = stats.total,
        exact = stats.exact_matches,
        likely = stats.likely_matches,
        no_match = stats.no_matches,
        errors = stats.errors,
        "Import preview resolved"
    );
    ImportPreview { stats, rows }
}

/// Commit a previewed batch.
///
/// Matched rows aggregate per entity and upsert concurrently; unmatched
/// rows each create one new entity in file order. Individual write
/// failures count as error rows and never abort the batch.
pub async fn commit(
    preview: &ImportPreview,
    catalog: &[CatalogEntry],
    writer: &dyn CatalogWriter,
) -> Result<ImportCommitOutcome> {
    let mut outcome = ImportCommitOutcome {
        error_rows: preview.stats.errors,
        ..ImportCommitOutcome::default()
    };

    let parsed: Vec<&ImportRow> = preview.rows.iter().filter_map(|p| p.row.as_ref()).collect();

    // One new entity per unmatched row, in file order.
    for row in parsed.iter().filter(|r| r.matched_catalog_id.is_none()) {
        if row.tier_was_likely(preview) {
            outcome.skipped_rows += 1;
            continue;
        }
        let entry = UpsertEntry::new(&row.producer, &row.wine_name)
            .with_vintage(row.vintage)
            .with_item(serde_json::to_value(row)?);
        match writer.upsert(entry).await {
            Ok(_) => {
                outcome.inserted_entities += 1;
                outcome.total_quantity += row.quantity;
            }
            Err(e) => {
                warn!(row_number = row.row_number, error = %e, "Row commit failed");
                outcome.error_rows += 1;
            }
        }
    }

    // One aggregated upsert per matched group, concurrently; the upserts
    // are idempotent so ordering between groups is immaterial.
    let matched: Vec<ImportRow> = parsed
        .iter()
        .filter(|r| r.matched_catalog_id.is_some())
        .map(|r| (*r).clone())
        .collect();
    let groups = aggregate(&matched);

    let mut upserts = FuturesUnordered::new();
    for (catalog_id, agg) in &groups {
        let entry = match catalog.iter().find(|e| e.id == *catalog_id) {
            Some(entry) => entry,
            None => {
                warn!(catalog_id = %catalog_id, "Matched entity missing from snapshot");
                outcome.error_rows += agg.row_count;
                continue;
            }
        };
        let request = UpsertEntry::new(&entry.producer, &entry.wine_name)
            .with_vintage(entry.vintage)
            .with_item(serde_json::to_value(agg)?);
        let quantity = agg.quantity;
        let row_count = agg.row_count;
        upserts.push(async move {
            (writer.upsert(request).await, quantity, row_count)
        });
    }

    while let Some((result, quantity, row_count)) = upserts.next().await {
        match result {
            Ok(_) => {
                outcome.upserted_items += 1;
                outcome.total_quantity += quantity;
            }
            Err(e) => {
                warn!(error = %e, "Group commit failed");
                outcome.error_rows += row_count;
            }
        }
    }

    info!(
        subsystem = "import",
        inserted = outcome.inserted_entities,
        upserted = outcome.upserted_items,
        total_quantity = outcome.total_quantity,
        skipped = outcome.skipped_rows,
        errors = outcome.error_rows,
        "Import committed"
    );
    Ok(outcome)
}

impl ImportRow {
    /// Whether this row previewed as a likely match (used to count skips
    /// when likely matches are not accepted).
    fn tier_was_likely(&self, preview: &ImportPreview) -> bool {
        preview
            .rows
            .iter()
            .find(|p| p.row_number == self.row_number)
            .and_then(|p| p.tier)
            == Some(MatchTier::LikelyMatch)
    }
}
