//! Confidence scores and their composition rules.
//!
//! Every confidence in the system flows through this newtype so the
//! composition rules (base similarity score, vintage bonus, cap at 1.0)
//! have exactly one home. The label-scan path and the bulk-import path
//! both derive candidate confidence here and cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::defaults;

/// A confidence value clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Zero confidence.
    pub const ZERO: Confidence = Confidence(0.0);

    /// Full confidence.
    pub const MAX: Confidence = Confidence(1.0);

    /// Create a confidence, clamping into `[0.0, 1.0]`.
    ///
    /// Non-finite input clamps to 0.0.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Confidence(value.clamp(0.0, 1.0))
        } else {
            Confidence(0.0)
        }
    }

    /// The inner value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Derive candidate confidence from a base match score.
    ///
    /// `confidence = min(score + VINTAGE_BONUS, 1.0)` when the query vintage
    /// matched the catalog entry's vintage, otherwise the score itself.
    pub fn from_score(score: f64, vintage_matched: bool) -> Self {
        let bonus = if vintage_matched {
            defaults::VINTAGE_BONUS
        } else {
            0.0
        };
        Confidence::new(score + bonus)
    }

    /// Whether this confidence clears the given threshold.
    pub fn at_least(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_range() {
        assert_eq!(Confidence::new(-0.5).value(), 0.0);
        assert_eq!(Confidence::new(0.0).value(), 0.0);
        assert_eq!(Confidence::new(0.73).value(), 0.73);
        assert_eq!(Confidence::new(1.0).value(), 1.0);
        assert_eq!(Confidence::new(1.5).value(), 1.0);
    }

    #[test]
    fn test_new_non_finite_is_zero() {
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::new(f64::INFINITY).value(), 0.0);
    }

    #[test]
    fn test_from_score_without_vintage() {
        let c = Confidence::from_score(0.75, false);
        assert_eq!(c.value(), 0.75);
    }

    #[test]
    fn test_from_score_applies_vintage_bonus() {
        let c = Confidence::from_score(0.75, true);
        assert!((c.value() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_from_score_bonus_caps_at_one() {
        let c = Confidence::from_score(0.95, true);
        assert_eq!(c.value(), 1.0);
    }

    #[test]
    fn test_at_least() {
        let c = Confidence::new(0.80);
        assert!(c.at_least(0.80));
        assert!(c.at_least(0.70));
        assert!(!c.at_least(0.81));
    }

    #[test]
    fn test_ordering() {
        assert!(Confidence::new(0.9) > Confidence::new(0.5));
        assert!(Confidence::ZERO < Confidence::MAX);
    }

    #[test]
    fn test_serde_transparent() {
        let c = Confidence::new(0.85);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "0.85");
        let back: Confidence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
