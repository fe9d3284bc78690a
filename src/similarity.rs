// Similarity scoring for candidate names
//
// Normalized Levenshtein similarity with an exact length gate so that
// pairs which cannot reach the threshold skip the distance table.

use strsim::levenshtein;

/// Normalize a name for comparison (trim, lowercase)
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Similarity of two already-normalized strings
fn normalized_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let distance = levenshtein(a, b);
    1.0 - distance as f64 / max_len as f64
}

/// Calculate similarity ratio between two names (0.0 - 1.0)
///
/// Both inputs are normalized first. Equal names (including two empty
/// names) score exactly 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_similarity(&normalize(a), &normalize(b))
}

/// Returns false when the length gap alone keeps a pair below `threshold`.
///
/// The distance is at least `max - min`, so the best reachable score is
/// `1 - (max - min) / max`. It is computed with the same float operations
/// as the real score, which keeps it an upper bound after rounding.
pub fn passes_length_gate(len_a: usize, len_b: usize, threshold: f64) -> bool {
    let (shorter, longer) = if len_a <= len_b {
        (len_a, len_b)
    } else {
        (len_b, len_a)
    };
    if longer == 0 {
        return true;
    }
    let best = 1.0 - (longer - shorter) as f64 / longer as f64;
    best >= threshold
}

/// Score a pair of normalized names, returning the similarity only when it
/// reaches `threshold`. The length gate runs before the distance table.
pub fn score_if_at_least(a: &str, b: &str, threshold: f64) -> Option<f64> {
    if a == b {
        return Some(1.0);
    }

    if !passes_length_gate(a.chars().count(), b.chars().count(), threshold) {
        return None;
    }

    let score = normalized_similarity(a, b);
    (score >= threshold).then_some(score)
}

/// Same as [`score_if_at_least`] but normalizes both inputs first
pub fn similarity_at_least(a: &str, b: &str, threshold: f64) -> Option<f64> {
    score_if_at_least(&normalize(a), &normalize(b), threshold)
}
