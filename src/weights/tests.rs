use crate::phylo::{Clade, PhyloTree};
use crate::tree::NodeId;
use crate::weights::{
    clip_branch_lengths, leaf_weights, set_branch_sums, set_node_weights, set_weights,
    WeightConfig,
};

const TOLERANCE: f64 = 1e-12;

// ((A:2,B:2)ab:1,(C:3)c:1)
fn sample_tree() -> (PhyloTree<&'static str>, [NodeId; 6]) {
    let mut tree = PhyloTree::new();
    let root = tree.insert(Clade::unlabeled());
    let ab = tree
        .append_data(root, Clade::new("ab").with_branch_length(1.0))
        .unwrap();
    let a = tree
        .append_data(ab, Clade::new("A").with_branch_length(2.0))
        .unwrap();
    let b = tree
        .append_data(ab, Clade::new("B").with_branch_length(2.0))
        .unwrap();
    let inner_c = tree
        .append_data(root, Clade::new("c").with_branch_length(1.0))
        .unwrap();
    let c = tree
        .append_data(inner_c, Clade::new("C").with_branch_length(3.0))
        .unwrap();
    (tree, [root, ab, a, b, inner_c, c])
}

#[test]
fn branch_sums_accumulate_bottom_up() {
    let (mut tree, [root, ab, a, b, inner_c, c]) = sample_tree();
    set_branch_sums(&mut tree, root).unwrap();
    assert_eq!(tree.data(a).unwrap().branch_sum, 0.0);
    assert_eq!(tree.data(b).unwrap().branch_sum, 0.0);
    assert_eq!(tree.data(c).unwrap().branch_sum, 0.0);
    assert_eq!(tree.data(ab).unwrap().branch_sum, 4.0);
    assert_eq!(tree.data(inner_c).unwrap().branch_sum, 3.0);
    assert_eq!(tree.data(root).unwrap().branch_sum, 9.0);
}

#[test]
fn node_weights_propagate_a_conserved_unit() {
    let (mut tree, [root, ab, a, b, inner_c, c]) = sample_tree();
    set_branch_sums(&mut tree, root).unwrap();
    set_node_weights(&mut tree, root).unwrap();

    assert_eq!(tree.data(root).unwrap().weight, 1.0);
    // ab gets (1 + 4) / 9, the c side (1 + 3) / 9.
    assert!((tree.data(ab).unwrap().weight - 5.0 / 9.0).abs() < TOLERANCE);
    assert!((tree.data(inner_c).unwrap().weight - 4.0 / 9.0).abs() < TOLERANCE);
    // A and B split ab's weight evenly: (2 + 0) / 4 each.
    assert!((tree.data(a).unwrap().weight - 5.0 / 18.0).abs() < TOLERANCE);
    assert!((tree.data(b).unwrap().weight - 5.0 / 18.0).abs() < TOLERANCE);
    // C inherits everything below inner_c.
    assert!((tree.data(c).unwrap().weight - 4.0 / 9.0).abs() < TOLERANCE);
}

#[test]
fn leaf_weights_sum_to_one() {
    let (mut tree, [root, ..]) = sample_tree();
    set_weights(&mut tree, root, &WeightConfig::default()).unwrap();
    let weights = leaf_weights(&tree, root).unwrap();
    assert_eq!(weights.len(), 3);
    let total: f64 = weights.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(weights.contains_key("A"));
    assert!(weights.contains_key("B"));
    assert!(weights.contains_key("C"));
}

#[test]
fn clipping_clamps_into_the_configured_range() {
    let mut tree: PhyloTree<&str> = PhyloTree::new();
    let root = tree.insert(Clade::unlabeled());
    let tiny = tree
        .append_data(root, Clade::new("tiny").with_branch_length(0.0))
        .unwrap();
    let huge = tree
        .append_data(root, Clade::new("huge").with_branch_length(1e30))
        .unwrap();
    let unset = tree.append_data(root, Clade::new("unset")).unwrap();

    let config = WeightConfig::default();
    clip_branch_lengths(&mut tree, root, &config).unwrap();
    assert_eq!(tree.data(tiny).unwrap().branch_length, Some(1e-9));
    assert_eq!(tree.data(huge).unwrap().branch_length, Some(1e9));
    // Unset lengths stay unset; clipping only touches explicit values.
    assert_eq!(tree.data(unset).unwrap().branch_length, None);
}

#[test]
fn zero_length_branches_survive_weighting_after_clipping() {
    let mut tree: PhyloTree<&str> = PhyloTree::new();
    let root = tree.insert(Clade::unlabeled());
    let inner = tree
        .append_data(root, Clade::new("i").with_branch_length(0.0))
        .unwrap();
    tree.append_data(inner, Clade::new("A").with_branch_length(0.0))
        .unwrap();
    tree.append_data(inner, Clade::new("B").with_branch_length(0.0))
        .unwrap();
    tree.append_data(root, Clade::new("C").with_branch_length(0.0))
        .unwrap();

    set_weights(&mut tree, root, &WeightConfig::default()).unwrap();
    let weights = leaf_weights(&tree, root).unwrap();
    let total: f64 = weights.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    for weight in weights.values() {
        assert!(weight.is_finite());
        assert!(*weight > 0.0);
    }
}

#[test]
fn custom_config_bounds_are_honored() {
    let mut tree: PhyloTree<&str> = PhyloTree::new();
    let root = tree.insert(Clade::unlabeled());
    let child = tree
        .append_data(root, Clade::new("x").with_branch_length(42.0))
        .unwrap();
    let config = WeightConfig {
        min_branch_length: 1.0,
        max_branch_length: 10.0,
    };
    clip_branch_lengths(&mut tree, root, &config).unwrap();
    assert_eq!(tree.data(child).unwrap().branch_length, Some(10.0));
}

#[test]
fn single_leaf_tree_gets_the_whole_weight() {
    let mut tree: PhyloTree<&str> = PhyloTree::new();
    let lone = tree.insert(Clade::new("only"));
    set_weights(&mut tree, lone, &WeightConfig::default()).unwrap();
    let weights = leaf_weights(&tree, lone).unwrap();
    assert_eq!(weights.get("only"), Some(&1.0));
}
