//! UPGMA: bottom-up hierarchical clustering of a distance matrix into an
//! ultrametric tree.

use ndarray::Axis;
use rayon::prelude::*;

use crate::clustering::distance_matrix::{ClusterError, DistanceMatrix, SENTINEL};
use crate::phylo::{Clade, PhyloTree};
use crate::tree::NodeId;

/// Candidate cell of the minimum scan: `(value, row, col)`.
type Candidate = (f64, usize, usize);

/// Keeps the candidate that a serial row-major scan would have found first:
/// strictly smaller value wins, ties go to the smaller `(row, col)`.
fn earlier(a: Candidate, b: Candidate) -> Candidate {
    if b.0 < a.0 || (b.0 == a.0 && (b.1, b.2) < (a.1, a.2)) {
        b
    } else {
        a
    }
}

/// Clusters `labels` into a single tree by repeatedly merging the closest
/// pair of the distance matrix.
///
/// Each merge gives the two clusters branch lengths of half the merge
/// distance minus the tip length they have already accumulated, which keeps
/// the tree ultrametric. The merged cluster's distances to all others are
/// the element-wise average of its two members' rows; the retired row and
/// column are filled with the sentinel instead of resizing the matrix.
///
/// Returns the finished tree and the handle of its root. A single label is
/// returned as-is with no merges performed.
pub fn upgma<L>(
    matrix: DistanceMatrix,
    labels: Vec<L>,
) -> Result<(PhyloTree<L>, NodeId), ClusterError> {
    let n = matrix.n();
    if n == 0 {
        return Err(ClusterError::Empty);
    }
    if labels.len() != n {
        return Err(ClusterError::LabelMismatch {
            labels: labels.len(),
            n,
        });
    }

    let mut tree = PhyloTree::with_capacity(2 * n - 1);
    // Slot k holds the live cluster for row/column k, None once retired.
    let mut nodes: Vec<Option<NodeId>> = labels
        .into_iter()
        .map(|label| Some(tree.insert(Clade::new(label))))
        .collect();
    let mut m = matrix.into_inner();

    for _ in 0..(n - 1) {
        let (d, i, j) = m
            .axis_iter(Axis(0))
            .into_par_iter()
            .enumerate()
            .filter_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(j, &value)| (value, i, j))
                    .reduce(earlier)
            })
            .reduce_with(earlier)
            .expect("the scan always sees at least one off-diagonal cell");

        let left = nodes[i].take().expect("minimum scan only visits live rows");
        let right = nodes[j].take().expect("minimum scan only visits live rows");

        // d/2 is the new cluster boundary; each side gets the part of it not
        // already consumed below.
        let half = d / 2.0;
        let left_tip = tree.data(left)?.tip_distance;
        let right_tip = tree.data(right)?.tip_distance;
        tree.data_mut(left)?.branch_length = Some(half - left_tip);
        tree.data_mut(right)?.branch_length = Some(half - right_tip);

        let mut merged = Clade::unlabeled();
        merged.tip_distance = half;
        let parent = tree.insert(merged);
        tree.append(parent, left)?;
        tree.append(parent, right)?;

        // Row/column i becomes the merged cluster's averaged distances;
        // row/column j is retired in place.
        for k in 0..n {
            if k == i || k == j {
                continue;
            }
            let avg = (m[[i, k]] + m[[j, k]]) / 2.0;
            m[[i, k]] = avg;
            m[[k, i]] = avg;
        }
        for k in 0..n {
            m[[j, k]] = SENTINEL;
            m[[k, j]] = SENTINEL;
        }
        m[[i, i]] = SENTINEL;

        nodes[i] = Some(parent);
    }

    let root = nodes
        .iter()
        .flatten()
        .next()
        .copied()
        .expect("n-1 merges leave exactly one live cluster");
    Ok((tree, root))
}
