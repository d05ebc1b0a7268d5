use std::cmp::Ordering;

use super::vectorizer::SparseVector;

/// Cosine similarity, 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (norm_a, norm_b) = (a.norm(), b.norm());
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (a.dot(b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Similarity of `query` to each row, in row order
pub fn similarities(query: &SparseVector, rows: &[SparseVector]) -> Vec<f64> {
    rows.iter().map(|row| cosine_similarity(query, row)).collect()
}

/// Indices of the `k` highest scores, highest first.
///
/// Equal scores keep ascending row order; NaN scores rank last.
pub fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    // stable sort keeps the lower index first among ties
    indices.sort_by(|&a, &b| descending(scores[a], scores[b]));
    indices.truncate(k);
    indices
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
