//! Pairwise similarity and brute-force top-k ranking.
//!
//! Every query is a full linear scan over the index. Fine for corpora that
//! fit in memory; there is no sub-linear structure here.

use quiver_core::{Record, SearchResult};
use std::cmp::Ordering;

/// Added to the norm product so all-zero vectors score 0 instead of NaN.
pub const EPSILON: f32 = 1e-8;

/// Dot product over the common prefix of `a` and `b`.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors: `dot(a, b) / (|a| * |b| + EPSILON)`.
///
/// Vectors of different length are not comparable and score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot(a, b) / (na * nb + EPSILON)
}

/// Descending order on scores. NaN sinks to the bottom and `-0.0 == 0.0`,
/// so the order is total and a stable sort keeps index order on ties.
pub(crate) fn descending(a: f32, b: f32) -> Ordering {
    fn key(x: f32) -> f32 {
        if x.is_nan() {
            f32::NEG_INFINITY
        } else {
            x + 0.0
        }
    }
    key(b).total_cmp(&key(a))
}

/// Scores every record against `query`, in index order.
pub fn score_records<'a>(records: &'a [Record], query: &[f32]) -> Vec<(&'a Record, f32)> {
    records
        .iter()
        .map(|r| (r, cosine_similarity(&r.vector, query)))
        .collect()
}

/// Records paired with their cosine similarity to `query`, best first.
/// Equal scores keep index order.
pub fn rank_records<'a>(records: &'a [Record], query: &[f32]) -> Vec<(&'a Record, f32)> {
    let mut scored = score_records(records, query);
    scored.sort_by(|a, b| descending(a.1, b.1));
    scored
}

/// Every record ranked by cosine similarity to `query`, best first.
pub fn rank_by_similarity(records: &[Record], query: &[f32]) -> Vec<SearchResult> {
    rank_records(records, query)
        .into_iter()
        .map(|(r, score)| SearchResult::from_record(r, score))
        .collect()
}

/// The `k` records most similar to `query`.
pub fn top_k(records: &[Record], query: &[f32], k: usize) -> Vec<SearchResult> {
    let mut ranked = rank_by_similarity(records, query);
    ranked.truncate(k);
    ranked
}
