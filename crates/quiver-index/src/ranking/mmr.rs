// Maximal Marginal Relevance, Carbonell & Goldstein 1998.

use crate::similarity::dot;
use quiver_core::SearchResult;

/// A candidate for diversity selection: the result to return plus the
/// stored vector it was scored from.
#[derive(Debug, Clone)]
pub struct MmrCandidate<'a> {
    /// What gets returned if this candidate is picked.
    pub result: SearchResult,
    /// Stored embedding; never exposed in the output.
    pub vector: &'a [f32],
}

/// Greedily picks up to `k` candidates trading relevance for diversity.
///
/// Each step scores every remaining candidate with
/// `λ·rel(c, q) - (1-λ)·max_{s ∈ selected} sim(c, s)` (no penalty while
/// nothing is selected) and moves the best one into the selection.
/// Similarity is the dot product, so vectors are expected L2-normalized.
///
/// Equal MMR scores go to the more relevant candidate, then to the earlier
/// one. With `λ = 0` this makes the first pick the most relevant item.
pub fn mmr_select(
    candidates: Vec<MmrCandidate<'_>>,
    query: &[f32],
    k: usize,
    lambda: f32,
) -> Vec<SearchResult> {
    let lambda = lambda.clamp(0.0, 1.0);
    let mut pool: Vec<(MmrCandidate<'_>, f32)> = candidates
        .into_iter()
        .map(|c| {
            let relevance = dot(c.vector, query);
            (c, relevance)
        })
        .collect();
    let mut chosen: Vec<MmrCandidate<'_>> = Vec::with_capacity(k.min(pool.len()));

    while chosen.len() < k && !pool.is_empty() {
        let mut best_idx = 0;
        let mut best = (f32::NEG_INFINITY, f32::NEG_INFINITY);

        for (i, (cand, relevance)) in pool.iter().enumerate() {
            let penalty = chosen
                .iter()
                .map(|s| dot(cand.vector, s.vector))
                .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |m| m.max(s))))
                .unwrap_or(0.0);
            let score = lambda * relevance - (1.0 - lambda) * penalty;

            if score > best.0 || (score == best.0 && *relevance > best.1) {
                best = (score, *relevance);
                best_idx = i;
            }
        }

        let (picked, _) = pool.remove(best_idx);
        chosen.push(picked);
    }

    chosen.into_iter().map(|c| c.result).collect()
}
