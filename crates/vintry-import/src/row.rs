//! Import row parsing: column-mapped raw cells to typed rows.
//!
//! Parsing is tolerant where a bad cell only loses enrichment (price,
//! rating, dates fall back to empty) and strict where it would corrupt the
//! merge (quantity, wine name). A failed row becomes a [`RowError`] and is
//! excluded from its batch individually; sibling rows are never affected.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vintry_core::defaults;
use vintry_core::models::BottleStatus;

/// Four-digit vintage year anywhere in a cell ("2015", "vintage 2015").
static VINTAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Leading numeric value with optional decimals, ignoring currency symbols
/// and grouping ("$1,234.50", "12.5 %").
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(\.\d+)?").unwrap());

/// One normalized spreadsheet row as column-mapped cells, exactly as the
/// upload parser produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub producer: Option<String>,
    pub wine_name: Option<String>,
    pub vintage: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub color: Option<String>,
    pub alcohol_percent: Option<String>,
    pub bottle_size: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<String>,
    pub drink_starting: Option<String>,
    pub drink_by: Option<String>,
    pub ratings_blob: Option<String>,
    pub status: Option<String>,
}

/// A single row that failed validation. Reported individually; never aborts
/// sibling rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row_number: usize,
    pub reason: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.reason)
    }
}

/// A typed, validated import row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    /// 1-based position in the uploaded file.
    pub row_number: usize,
    pub producer: String,
    pub wine_name: String,
    pub vintage: Option<i32>,
    pub quantity: u32,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub color: Option<String>,
    pub alcohol_percent: Option<f32>,
    pub bottle_size: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<u8>,
    pub drink_starting: Option<NaiveDate>,
    pub drink_by: Option<NaiveDate>,
    pub ratings_blob: Option<String>,
    pub status: Option<BottleStatus>,
    /// Set by the matching pass; rows without it are handled as new-entity
    /// creations, not aggregated.
    pub matched_catalog_id: Option<Uuid>,
}

impl ImportRow {
    /// Parse and validate one raw row.
    pub fn parse(row_number: usize, raw: &RawRow) -> Result<ImportRow, RowError> {
        let wine_name = match non_empty(&raw.wine_name) {
            Some(name) => name.to_string(),
            None => {
                return Err(RowError {
                    row_number,
                    reason: "wine name is required".to_string(),
                })
            }
        };

        let quantity = match non_empty(&raw.quantity) {
            None => defaults::DEFAULT_ROW_QUANTITY,
            Some(cell) => cell.parse::<u32>().map_err(|_| RowError {
                row_number,
                reason: format!("quantity {:?} is not a whole number", cell),
            })?,
        };

        Ok(ImportRow {
            row_number,
            producer: non_empty(&raw.producer).unwrap_or_default().to_string(),
            wine_name,
            vintage: non_empty(&raw.vintage).and_then(parse_vintage),
            quantity,
            price: non_empty(&raw.price).and_then(parse_number),
            currency: non_empty(&raw.currency).map(str::to_string),
            color: non_empty(&raw.color).map(str::to_string),
            alcohol_percent: non_empty(&raw.alcohol_percent)
                .and_then(parse_number)
                .map(|v| v as f32),
            bottle_size: non_empty(&raw.bottle_size).map(str::to_string),
            location: non_empty(&raw.location).map(str::to_string),
            notes: non_empty(&raw.notes).map(str::to_string),
            rating: non_empty(&raw.rating).and_then(parse_rating),
            drink_starting: non_empty(&raw.drink_starting).and_then(parse_date),
            drink_by: non_empty(&raw.drink_by).and_then(parse_date),
            ratings_blob: non_empty(&raw.ratings_blob).map(str::to_string),
            status: non_empty(&raw.status).and_then(|s| s.parse().ok()),
            matched_catalog_id: None,
        })
    }
}

fn non_empty(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_vintage(cell: &str) -> Option<i32> {
    VINTAGE_RE
        .find(cell)
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell.replace(',', "");
    NUMBER_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_rating(cell: &str) -> Option<u8> {
    parse_number(cell)
        .map(|v| v.round())
        .filter(|v| (0.0..=100.0).contains(v))
        .map(|v| v as u8)
}

/// `YYYY-MM-DD`, or a bare year taken as January 1st.
fn parse_date(cell: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return Some(date);
    }
    let year: i32 = cell.parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(wine_name: &str) -> RawRow {
        RawRow {
            wine_name: Some(wine_name.to_string()),
            ..RawRow::default()
        }
    }

    #[test]
    fn test_minimal_row_parses_with_defaults() {
        let row = ImportRow::parse(1, &raw("Grange")).unwrap();
        assert_eq!(row.wine_name, "Grange");
        assert_eq!(row.producer, "");
        assert_eq!(row.quantity, 1);
        assert!(row.vintage.is_none());
        assert!(row.matched_catalog_id.is_none());
    }

    #[test]
    fn test_missing_wine_name_is_row_error() {
        let err = ImportRow::parse(4, &RawRow::default()).unwrap_err();
        assert_eq!(err.row_number, 4);
        assert!(err.reason.contains("wine name"));

        let blank = RawRow {
            wine_name: Some("   ".to_string()),
            ..RawRow::default()
        };
        assert!(ImportRow::parse(5, &blank).is_err());
    }

    #[test]
    fn test_bad_quantity_is_row_error() {
        let mut r = raw("Grange");
        r.quantity = Some("a few".to_string());
        let err = ImportRow::parse(2, &r).unwrap_err();
        assert!(err.reason.contains("quantity"));
    }

    #[test]
    fn test_vintage_extracted_from_noisy_cell() {
        let mut r = raw("Grange");
        r.vintage = Some("vintage 2015".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().vintage, Some(2015));

        r.vintage = Some("n/a".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().vintage, None);
    }

    #[test]
    fn test_price_tolerates_currency_formatting() {
        let mut r = raw("Grange");
        r.price = Some("$1,234.50".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().price, Some(1234.5));

        r.price = Some("market".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().price, None);
    }

    #[test]
    fn test_rating_bounds() {
        let mut r = raw("Grange");
        r.rating = Some("96".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().rating, Some(96));

        r.rating = Some("850".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().rating, None);
    }

    #[test]
    fn test_date_formats() {
        let mut r = raw("Grange");
        r.drink_starting = Some("2025-06-01".to_string());
        r.drink_by = Some("2040".to_string());
        let row = ImportRow::parse(1, &r).unwrap();
        assert_eq!(
            row.drink_starting,
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
        assert_eq!(row.drink_by, NaiveDate::from_ymd_opt(2040, 1, 1));
    }

    #[test]
    fn test_status_parses_tolerantly() {
        let mut r = raw("Grange");
        r.status = Some("Drunk".to_string());
        assert_eq!(
            ImportRow::parse(1, &r).unwrap().status,
            Some(BottleStatus::Drank)
        );

        r.status = Some("???".to_string());
        assert_eq!(ImportRow::parse(1, &r).unwrap().status, None);
    }

    #[test]
    fn test_alcohol_percent_from_label_text() {
        let mut r = raw("Grange");
        r.alcohol_percent = Some("14.5 %".to_string());
        let row = ImportRow::parse(1, &r).unwrap();
        assert_eq!(row.alcohol_percent, Some(14.5));
    }

    #[test]
    fn test_row_error_display() {
        let err = RowError {
            row_number: 9,
            reason: "quantity \"x\" is not a whole number".to_string(),
        };
        assert!(err.to_string().starts_with("row 9:"));
    }
}
