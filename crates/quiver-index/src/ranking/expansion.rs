/// Coordinate-wise mean of the query vector and its neighbour vectors:
/// `(q + Σ n_i) / (m + 1)` for `m` neighbours.
///
/// Neighbour components past the query length are ignored; missing ones
/// count as zero.
pub fn expand_query_vector(query: &[f32], neighbors: &[&[f32]]) -> Vec<f32> {
    let denom = (neighbors.len() + 1) as f32;
    (0..query.len())
        .map(|i| {
            let neighbor_sum: f32 = neighbors
                .iter()
                .map(|n| n.get(i).copied().unwrap_or(0.0))
                .sum();
            (query[i] + neighbor_sum) / denom
        })
        .collect()
}
