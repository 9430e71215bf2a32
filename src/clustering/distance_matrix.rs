//! Symmetric pairwise distance matrix with a sentinel diagonal.

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use thiserror::Error;

use crate::tree::TreeError;

/// Diagonal marker; never selected as a minimum by the clustering scan.
pub const SENTINEL: f64 = f64::INFINITY;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("distance matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("distance matrix is asymmetric at ({i}, {j}): {a} vs {b}")]
    Asymmetric { i: usize, j: usize, a: f64, b: f64 },

    #[error("{labels} labels for a {n}x{n} distance matrix")]
    LabelMismatch { labels: usize, n: usize },

    #[error("cannot cluster an empty distance matrix")]
    Empty,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// An N×N symmetric matrix of pairwise distances over a working cluster set.
///
/// The diagonal always holds [SENTINEL] so self-distances are never chosen
/// as a merge candidate.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    data: Array2<f64>,
}

impl DistanceMatrix {
    /// Validates a full square matrix and takes ownership of it.
    ///
    /// Fails fast on non-square or asymmetric input instead of clustering
    /// nonsense silently. The diagonal is overwritten with [SENTINEL];
    /// off-diagonal values are kept as given.
    pub fn from_square(mut data: Array2<f64>) -> Result<Self, ClusterError> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(ClusterError::NotSquare { rows, cols });
        }
        for (i, j) in (0..rows).tuple_combinations() {
            let a = data[[i, j]];
            let b = data[[j, i]];
            if (a - b).abs() > 1e-9 * a.abs().max(1.0) {
                return Err(ClusterError::Asymmetric { i, j, a, b });
            }
        }
        for i in 0..rows {
            data[[i, i]] = SENTINEL;
        }
        Ok(DistanceMatrix { data })
    }

    /// Precomputes all pairwise distances from `f`, in parallel.
    ///
    /// `f` is only ever called with `i < j`, so symmetry holds by
    /// construction.
    pub fn from_fn<F>(n: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        Self::build(n, f, None)
    }

    /// [from_fn](Self::from_fn) with a progress bar, for expensive distance
    /// functions over large inputs.
    pub fn from_fn_with_progress<F>(n: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let pb = ProgressBar::new(n as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} {wide_bar:.green/gray} {pos}/{len} [{elapsed_precise}]({eta})")
                .unwrap()
                .progress_chars("█▓░"),
        );
        pb.set_message("Building distance matrix");
        let matrix = Self::build(n, f, Some(&pb));
        pb.finish();
        matrix
    }

    fn build<F>(n: usize, f: F, pb: Option<&ProgressBar>) -> Self
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let row = (0..n)
                    .map(|j| {
                        if i == j {
                            SENTINEL
                        } else if i < j {
                            f(i, j)
                        } else {
                            f(j, i)
                        }
                    })
                    .collect();
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                row
            })
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n, n), flat)
            .expect("row-major buffer always matches the n x n shape");
        DistanceMatrix { data }
    }

    /// Side length of the matrix.
    pub fn n(&self) -> usize {
        self.data.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub(crate) fn into_inner(self) -> Array2<f64> {
        self.data
    }
}
