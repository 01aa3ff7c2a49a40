//! Deterministic merge of rows resolved to the same catalog entity.
//!
//! Merge rules are order-sensitive (row order = input order, typically file
//! order) and idempotent: re-aggregating an aggregate treated as a single
//! row is a fixpoint, which is what makes the commit step safely
//! retryable.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use vintry_core::defaults;
use vintry_core::models::BottleStatus;

use crate::row::ImportRow;

/// The merged upsert payload for one catalog entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub catalog_id: Uuid,
    /// Number of raw rows merged into this aggregate (provenance over the
    /// immediate input, not carried through re-aggregation).
    pub row_count: usize,
    /// Sum over the group.
    pub quantity: u32,
    /// Most frequent non-empty value, ties by first occurrence.
    pub location: Option<String>,
    /// Last non-empty value wins.
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub color: Option<String>,
    pub alcohol_percent: Option<f32>,
    pub bottle_size: Option<String>,
    /// Distinct non-empty values joined, capped.
    pub notes: Option<String>,
    /// Maximum over the group.
    pub rating: Option<u8>,
    /// Minimum over the group (widen the drinking window).
    pub drink_starting: Option<NaiveDate>,
    /// Maximum over the group.
    pub drink_by: Option<NaiveDate>,
    /// Exact-string deduplicated, joined, capped.
    pub ratings_blob: Option<String>,
    /// Highest-priority status (`Stored > Drank > Lost`).
    pub status: Option<BottleStatus>,
}

impl AggregatedRow {
    /// View this aggregate as a single import row, for retrying a commit
    /// through the same merge path.
    pub fn as_singleton_row(&self, producer: &str, wine_name: &str) -> ImportRow {
        ImportRow {
            row_number: 1,
            producer: producer.to_string(),
            wine_name: wine_name.to_string(),
            vintage: None,
            quantity: self.quantity,
            price: self.price,
            currency: self.currency.clone(),
            color: self.color.clone(),
            alcohol_percent: self.alcohol_percent,
            bottle_size: self.bottle_size.clone(),
            location: self.location.clone(),
            notes: self.notes.clone(),
            rating: self.rating,
            drink_starting: self.drink_starting,
            drink_by: self.drink_by,
            ratings_blob: self.ratings_blob.clone(),
            status: self.status,
            matched_catalog_id: Some(self.catalog_id),
        }
    }
}

/// Group rows by `matched_catalog_id` and merge each group.
///
/// Unmatched rows are excluded; they are handled upstream as one new
/// catalog entity per row. The `BTreeMap` keeps iteration order stable for
/// deterministic commits.
pub fn aggregate(rows: &[ImportRow]) -> BTreeMap<Uuid, AggregatedRow> {
    let mut groups: BTreeMap<Uuid, Vec<&ImportRow>> = BTreeMap::new();
    for row in rows {
        if let Some(id) = row.matched_catalog_id {
            groups.entry(id).or_default().push(row);
        }
    }

    let merged: BTreeMap<Uuid, AggregatedRow> = groups
        .into_iter()
        .map(|(id, group)| (id, merge_group(id, &group)))
        .collect();

    debug!(
        subsystem = "import",
        component = "aggregator",
        row_count = rows.len(),
        group_count = merged.len(),
        "Aggregated import rows"
    );
    merged
}

fn merge_group(catalog_id: Uuid, group: &[&ImportRow]) -> AggregatedRow {
    AggregatedRow {
        catalog_id,
        row_count: group.len(),
        quantity: group.iter().map(|r| r.quantity).sum(),
        location: most_frequent(group.iter().filter_map(|r| r.location.as_deref())),
        price: group.iter().filter_map(|r| r.price).last(),
        currency: last_non_empty(group.iter().map(|r| r.currency.as_deref())),
        color: last_non_empty(group.iter().map(|r| r.color.as_deref())),
        alcohol_percent: group.iter().filter_map(|r| r.alcohol_percent).last(),
        bottle_size: last_non_empty(group.iter().map(|r| r.bottle_size.as_deref())),
        notes: join_distinct_capped(
            group.iter().filter_map(|r| r.notes.as_deref()),
            defaults::NOTES_MAX_CHARS,
        ),
        rating: group.iter().filter_map(|r| r.rating).max(),
        drink_starting: group.iter().filter_map(|r| r.drink_starting).min(),
        drink_by: group.iter().filter_map(|r| r.drink_by).max(),
        ratings_blob: join_distinct_capped(
            group.iter().filter_map(|r| r.ratings_blob.as_deref()),
            defaults::NOTES_MAX_CHARS,
        ),
        status: group
            .iter()
            .filter_map(|r| r.status)
            .reduce(BottleStatus::merge),
    }
}

/// Most frequently occurring value; ties broken by first occurrence.
fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    // First-seen order doubles as the tie-break order.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    // max_by_key would return the last maximum; ties must go to the first.
    let best = counts.iter().map(|(_, n)| *n).max()?;
    counts
        .iter()
        .find(|(_, n)| *n == best)
        .map(|(v, _)| v.to_string())
}

fn last_non_empty<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    values.flatten().last().map(str::to_string)
}

/// Join distinct values in first-occurrence order, truncated to `cap`
/// characters. Truncation is on a char boundary and idempotent.
fn join_distinct_capped<'a>(
    values: impl Iterator<Item = &'a str>,
    cap: usize,
) -> Option<String> {
    let mut distinct: Vec<&str> = Vec::new();
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    if distinct.is_empty() {
        return None;
    }
    let joined = distinct.join(defaults::NOTES_SEPARATOR);
    Some(joined.chars().take(cap).collect())
}
