//! String similarity kernel: bigram sets scored with the Dice coefficient.
//!
//! Both inputs pass through the shared normalization in
//! `vintry_core::text` before windowing; scoring raw strings against
//! normalized catalog data would make every score meaningless.

use std::collections::HashSet;

use vintry_core::text::normalize;

/// Similarity between two strings in `[0, 1]`.
///
/// Identical normalized strings score 1.0; either side empty after
/// normalization scores 0.0. Otherwise the score is the Dice coefficient
/// `2|A∩B| / (|A| + |B|)` over the bigram sets of the space-free
/// normalized character sequences.
pub fn similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize(a);
    let norm_b = normalize(b);

    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 1.0;
    }

    let bigrams_a = bigrams(&norm_a);
    let bigrams_b = bigrams(&norm_b);
    dice(&bigrams_a, &bigrams_b)
}

/// Overlapping 2-character windows of a normalized string, spaces removed
/// so word boundaries still contribute signal ("chateaumargaux").
fn bigrams(normalized: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = normalized.chars().filter(|c| !c.is_whitespace()).collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Dice coefficient over two bigram sets.
fn dice(a: &HashSet<(char, char)>, b: &HashSet<(char, char)>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    2.0 * intersection as f64 / (a.len() + b.len()) as f64
}
