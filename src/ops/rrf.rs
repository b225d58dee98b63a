//! Reciprocal Rank Fusion.
//!
//! Combines a vector-ranked list and a text-ranked list by rank position
//! alone: each id scores Σ 1/(c + rank) over the lists it appears in.
//! Absolute scores are carried through for display but never normalised.

use hashbrown::HashMap;

use super::ScoredId;

/// A fused hit: RRF score plus the source scores where the id appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: String,
    pub rrf: f64,
    pub vector_score: Option<f64>,
    pub bm25: Option<f64>,
}

/// Fuse two ranked lists, returning the top `k` by RRF score.
///
/// Ranks are 1-based. Ties break on id ascending, so repeated fusions of
/// the same inputs return the same order.
pub fn fuse(vector_hits: &[ScoredId], text_hits: &[ScoredId], c: f64, k: usize) -> Vec<FusedHit> {
    let mut fused: HashMap<String, FusedHit> = HashMap::new();

    for (rank, (id, score)) in vector_hits.iter().enumerate() {
        let entry = fused.entry(id.clone()).or_insert_with(|| FusedHit {
            id: id.clone(),
            rrf: 0.0,
            vector_score: None,
            bm25: None,
        });
        entry.rrf += 1.0 / (c + (rank + 1) as f64);
        entry.vector_score = Some(*score);
    }

    for (rank, (id, score)) in text_hits.iter().enumerate() {
        let entry = fused.entry(id.clone()).or_insert_with(|| FusedHit {
            id: id.clone(),
            rrf: 0.0,
            vector_score: None,
            bm25: None,
        });
        entry.rrf += 1.0 / (c + (rank + 1) as f64);
        entry.bm25 = Some(*score);
    }

    let mut merged: Vec<FusedHit> = fused.into_values().collect();
    merged.sort_by(|a, b| match b.rrf.partial_cmp(&a.rrf) {
        Some(std::cmp::Ordering::Equal) | None => a.id.cmp(&b.id),
        Some(ordering) => ordering,
    });
    merged.truncate(k);
    merged
}
