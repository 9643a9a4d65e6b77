//! Pure similarity scoring between a parsed citation and a candidate match.
//!
//! Text similarity is word-set Jaccard overlap, not edit distance. The
//! verification thresholds elsewhere are calibrated to this metric; do not
//! swap it out without re-deriving them.

use std::collections::HashSet;

/// Jaccard word-overlap similarity as a rounded percentage.
///
/// Strings equal after trimming and lowercasing score exactly 100; an
/// empty input on either side scores 0.
pub fn text_similarity(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }

    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (100.0 * intersection as f64 / union as f64).round() as u8;
    score
}

/// Similarity of publication years: exact match 100, one year apart 80,
/// within three years 60, anything else 0. Requires both years.
pub fn date_similarity(parsed_year: Option<u32>, match_year: Option<u32>) -> u8 {
    let (Some(a), Some(b)) = (parsed_year, match_year) else {
        return 0;
    };

    match a.abs_diff(b) {
        0 => 100,
        1 => 80,
        2 | 3 => 60,
        _ => 0,
    }
}
