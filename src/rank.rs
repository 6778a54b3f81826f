//! Exact cosine-similarity ranking.
//!
//! Candidates are scored against the query vector with a full linear scan
//! and sorted by descending score. The sort is stable, so candidates with
//! equal scores keep the order they were supplied in (store insertion order).

use crate::models::ScoredChunk;

/// A stored vector eligible for ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, a
/// zero-norm vector, or any non-finite component. Sums are accumulated in
/// `f64` so large finite components do not overflow the norms.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || denom < f64::from(f32::EPSILON) {
        return 0.0;
    }

    let score = (dot / denom) as f32;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Score every candidate and return the best `k`, highest first.
pub fn top_k(query: &[f32], candidates: Vec<Candidate>, k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .map(|c| ScoredChunk {
            score: cosine_similarity(query, &c.vector),
            id: c.id,
            text: c.text,
        })
        .collect();

    // Vec::sort_by is stable: ties keep supply order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}
