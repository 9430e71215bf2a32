use ndarray::{arr2, Array2};

use crate::clustering::{upgma, ClusterError, DistanceMatrix, SENTINEL};
use crate::weights::{set_weights, WeightConfig};

fn five_leaf_matrix() -> Array2<f64> {
    // A-B:1, A-C:4, A-D:20, A-E:22, B-C:5, B-D:21, B-E:23,
    // C-D:10, C-E:12, D-E:2
    arr2(&[
        [0.0, 1.0, 4.0, 20.0, 22.0],
        [1.0, 0.0, 5.0, 21.0, 23.0],
        [4.0, 5.0, 0.0, 10.0, 12.0],
        [20.0, 21.0, 10.0, 0.0, 2.0],
        [22.0, 23.0, 12.0, 2.0, 0.0],
    ])
}

#[test]
fn from_square_sets_the_sentinel_diagonal() {
    let matrix = DistanceMatrix::from_square(five_leaf_matrix()).unwrap();
    assert_eq!(matrix.n(), 5);
    for i in 0..5 {
        assert_eq!(matrix.get(i, i), SENTINEL);
    }
    assert_eq!(matrix.get(0, 3), 20.0);
}

#[test]
fn from_square_rejects_non_square_input() {
    let err = DistanceMatrix::from_square(Array2::zeros((3, 4))).unwrap_err();
    assert!(matches!(err, ClusterError::NotSquare { rows: 3, cols: 4 }));
}

#[test]
fn from_square_rejects_asymmetric_input() {
    let mut data = five_leaf_matrix();
    data[[1, 3]] = 99.0;
    let err = DistanceMatrix::from_square(data).unwrap_err();
    assert!(matches!(err, ClusterError::Asymmetric { i: 1, j: 3, .. }));
}

#[test]
fn from_fn_matches_the_pairwise_function() {
    let matrix = DistanceMatrix::from_fn(4, |i, j| (i + j) as f64);
    assert_eq!(matrix.get(1, 2), 3.0);
    assert_eq!(matrix.get(2, 1), 3.0);
    assert_eq!(matrix.get(3, 3), SENTINEL);
}

#[test]
fn upgma_five_leaf_fixture() {
    let matrix = DistanceMatrix::from_square(five_leaf_matrix()).unwrap();
    let labels = vec!["A", "B", "C", "D", "E"];
    let (tree, root) = upgma(matrix, labels).unwrap();
    assert_eq!(
        tree.to_newick(root).unwrap(),
        "(((A:0.5,B:0.5):1.75,C:2.25):5.875,(D:1.0,E:1.0):7.125)"
    );
    assert_eq!(tree.len(), 9);
}

#[test]
fn upgma_trees_are_ultrametric() {
    let matrix = DistanceMatrix::from_square(five_leaf_matrix()).unwrap();
    let (tree, root) = upgma(matrix, vec!["A", "B", "C", "D", "E"]).unwrap();

    let leaf_depths: Vec<f64> = tree
        .traverse(root, false, false)
        .unwrap()
        .map(|leaf| tree.distance(leaf, root).unwrap().unwrap())
        .collect();
    assert_eq!(leaf_depths.len(), 5);
    for depth in &leaf_depths {
        assert!((depth - leaf_depths[0]).abs() < 1e-12);
    }
}

#[test]
fn upgma_single_leaf_is_returned_unchanged() {
    let matrix = DistanceMatrix::from_square(arr2(&[[0.0]])).unwrap();
    let (tree, root) = upgma(matrix, vec!["only"]).unwrap();
    assert_eq!(tree.len(), 1);
    assert!(tree.get(root).unwrap().is_leaf());
    assert_eq!(tree.data(root).unwrap().label, Some("only"));
    assert_eq!(tree.data(root).unwrap().branch_length, None);
}

#[test]
fn upgma_rejects_label_count_mismatch() {
    let matrix = DistanceMatrix::from_square(five_leaf_matrix()).unwrap();
    let err = upgma(matrix, vec!["A", "B"]).unwrap_err();
    assert!(matches!(err, ClusterError::LabelMismatch { labels: 2, n: 5 }));
}

#[test]
fn upgma_rejects_empty_input() {
    let matrix = DistanceMatrix::from_square(Array2::zeros((0, 0))).unwrap();
    let err = upgma(matrix, Vec::<&str>::new()).unwrap_err();
    assert!(matches!(err, ClusterError::Empty));
}

#[test]
fn ties_resolve_to_the_first_cell_in_row_major_order() {
    // d(A,B) == d(C,D) == 1; the (A,B) cell comes first row-major, so A and
    // B must merge first and end up deeper in the output.
    let data = arr2(&[
        [0.0, 1.0, 8.0, 8.0],
        [1.0, 0.0, 8.0, 8.0],
        [8.0, 8.0, 0.0, 1.0],
        [8.0, 8.0, 1.0, 0.0],
    ]);
    let matrix = DistanceMatrix::from_square(data).unwrap();
    let (tree, root) = upgma(matrix, vec!["A", "B", "C", "D"]).unwrap();
    assert_eq!(
        tree.to_newick(root).unwrap(),
        "((A:0.5,B:0.5):3.5,(C:0.5,D:0.5):3.5)"
    );
}

#[test]
fn upgma_output_feeds_the_weighting_engine() {
    let matrix = DistanceMatrix::from_square(five_leaf_matrix()).unwrap();
    let (mut tree, root) = upgma(matrix, vec!["A", "B", "C", "D", "E"]).unwrap();
    set_weights(&mut tree, root, &WeightConfig::default()).unwrap();
    let total: f64 = tree.leaf_weights(root).unwrap().values().sum();
    assert!((total - 1.0).abs() < 1e-9);
}
