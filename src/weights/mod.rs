//! Branch-length weighting: propagates a conserved unit of weight from the
//! root down to the leaves, proportional to each branch's share of its
//! parent's subtree branch length.

use std::collections::HashMap;
use std::hash::Hash;

use crate::phylo::PhyloTree;
use crate::tree::{NodeId, TreeError};

#[cfg(test)]
mod tests;

/// Clamp bounds for branch lengths, passed explicitly to the engine.
#[derive(Debug, Clone, Copy)]
pub struct WeightConfig {
    pub min_branch_length: f64,
    pub max_branch_length: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        WeightConfig {
            min_branch_length: 1e-9,
            max_branch_length: 1e9,
        }
    }
}

/// Clamps every set branch length in the subtree to the configured range,
/// so later divisions never see zero, negative or degenerate values.
pub fn clip_branch_lengths<L>(
    tree: &mut PhyloTree<L>,
    root: NodeId,
    config: &WeightConfig,
) -> Result<(), TreeError> {
    let order: Vec<NodeId> = tree.descendants(root)?.collect();
    for id in order {
        if let Some(length) = tree.data(id)?.branch_length {
            tree.data_mut(id)?.branch_length =
                Some(length.clamp(config.min_branch_length, config.max_branch_length));
        }
    }
    Ok(())
}

/// Post-order pass filling `branch_sum`: the total branch length contained
/// in each node's subtree. Leaves get zero.
pub fn set_branch_sums<L>(tree: &mut PhyloTree<L>, root: NodeId) -> Result<(), TreeError> {
    let order: Vec<NodeId> = tree.descendants_post(root)?.collect();
    for id in order {
        let children: Vec<NodeId> = tree.children(id)?.to_vec();
        let mut sum = 0.0;
        for child in children {
            let clade = tree.data(child)?;
            sum += clade.branch_sum + clade.branch_length.unwrap_or(0.0);
        }
        tree.data_mut(id)?.branch_sum = sum;
    }
    Ok(())
}

/// Pre-order pass filling `weight`, assuming `branch_sum` is current.
///
/// The root gets 1.0; every other node gets
/// `parent_weight * (branch_length + branch_sum) / parent_branch_sum`.
/// Since the children's `branch_length + branch_sum` values add up to the
/// parent's `branch_sum`, the unit of weight is conserved on the way down.
pub fn set_node_weights<L>(tree: &mut PhyloTree<L>, root: NodeId) -> Result<(), TreeError> {
    let order: Vec<NodeId> = tree.descendants(root)?.collect();
    for id in order {
        if id == root {
            tree.data_mut(id)?.weight = 1.0;
            continue;
        }
        let parent = tree
            .parent(id)?
            .expect("pre-order below the root always has a parent");
        let parent_weight = tree.data(parent)?.weight;
        let parent_sum = tree.data(parent)?.branch_sum;
        let clade = tree.data(id)?;
        let share = clade.branch_length.unwrap_or(0.0) + clade.branch_sum;
        // A zero parent sum only happens on degenerate all-zero subtrees;
        // clipping beforehand rules it out.
        let weight = if parent_sum > 0.0 {
            parent_weight * share / parent_sum
        } else {
            0.0
        };
        tree.data_mut(id)?.weight = weight;
    }
    Ok(())
}

/// Full weighting pass: clip, accumulate branch sums, propagate weights.
pub fn set_weights<L>(
    tree: &mut PhyloTree<L>,
    root: NodeId,
    config: &WeightConfig,
) -> Result<(), TreeError> {
    clip_branch_lengths(tree, root, config)?;
    set_branch_sums(tree, root)?;
    set_node_weights(tree, root)
}

/// Weights of the labeled leaves under `root`, keyed by label. After
/// [set_weights] the values sum to 1.0 up to floating-point error.
pub fn leaf_weights<L>(tree: &PhyloTree<L>, root: NodeId) -> Result<HashMap<L, f64>, TreeError>
where
    L: Clone + Eq + Hash,
{
    tree.leaf_weights(root)
}
