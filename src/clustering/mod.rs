//! Hierarchical clustering over pairwise distance matrices.

pub mod distance_matrix;
pub mod upgma;

#[cfg(test)]
mod tests;

pub use distance_matrix::{ClusterError, DistanceMatrix, SENTINEL};
pub use upgma::upgma;
