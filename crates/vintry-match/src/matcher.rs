//! Catalog matcher: weighted field scoring, admission filter, ranking,
//! tier derivation.

use tracing::debug;

use vintry_core::confidence::Confidence;
use vintry_core::defaults;
use vintry_core::models::{CatalogEntry, MatchCandidate, MatchQuery, MatchResult, MatchTier};

use crate::similarity::similarity;

/// Matcher configuration, explicit per call.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Hard admission threshold: candidates scoring below this are
    /// discarded entirely, never ranked or returned.
    pub threshold: f64,
    /// Confidence at or above which the top candidate tiers as exact.
    pub exact_confidence: f64,
    /// Weight of producer similarity in the combined score.
    pub producer_weight: f64,
    /// Weight of wine-name similarity in the combined score.
    pub wine_name_weight: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::MATCH_ADMISSION_THRESHOLD,
            exact_confidence: defaults::EXACT_MATCH_CONFIDENCE,
            producer_weight: defaults::PRODUCER_WEIGHT,
            wine_name_weight: defaults::WINE_NAME_WEIGHT,
        }
    }
}

impl MatcherConfig {
    /// Set the admission threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Score a query against a catalog snapshot and rank the survivors.
///
/// `score = producer_weight·sim(producer) + wine_name_weight·sim(wine_name)`;
/// confidence adds the vintage bonus via [`Confidence::from_score`].
/// Ranking is confidence descending; equal confidence is broken by vintage
/// match first, then score descending, then catalog id so the order is
/// deterministic.
pub fn match_entries(
    query: &MatchQuery,
    entries: &[CatalogEntry],
    config: &MatcherConfig,
) -> MatchResult {
    let mut candidates: Vec<MatchCandidate> = entries
        .iter()
        .filter_map(|entry| {
            let producer_sim = similarity(&query.producer, &entry.producer);
            let name_sim = similarity(&query.wine_name, &entry.wine_name);
            let score =
                config.producer_weight * producer_sim + config.wine_name_weight * name_sim;

            if score < config.threshold {
                return None;
            }

            let vintage_matched = match (query.vintage, entry.vintage) {
                (Some(q), Some(e)) => q == e,
                _ => false,
            };

            Some(MatchCandidate {
                catalog_id: entry.id,
                score,
                confidence: Confidence::from_score(score, vintage_matched),
                vintage_matched,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.vintage_matched.cmp(&a.vintage_matched))
            .then_with(|| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.catalog_id.cmp(&b.catalog_id))
    });

    let tier = match candidates.first() {
        Some(top) if top.confidence.at_least(config.exact_confidence) => MatchTier::ExactMatch,
        Some(top) if top.confidence.at_least(config.threshold) => MatchTier::LikelyMatch,
        Some(_) => MatchTier::NoMatch,
        None => MatchTier::NoMatch,
    };

    debug!(
        subsystem = "match",
        component = "matcher",
        candidate_count = candidates.len(),
        pool_size = entries.len(),
        tier = %tier,
        top_score = candidates.first().map(|c| c.score).unwrap_or(0.0),
        "Catalog match complete"
    );

    MatchResult { candidates, tier }
}
