//! Ranking strategies built on top of the similarity scan.

/// Neighbour-averaged query vectors (pseudo-relevance feedback).
pub mod expansion;
/// Maximal Marginal Relevance diversity selection.
pub mod mmr;
/// Temperature softmax, entropy, and confidence.
pub mod softmax;

pub use expansion::expand_query_vector;
pub use mmr::{mmr_select, MmrCandidate};
pub use softmax::{confidence, entropy, softmax};
