//! Phylogenetic tree payload and operations layered on the generic arena.

use std::collections::HashMap;
use std::fmt::Display;

use crate::newick;
use crate::tree::{NodeId, Tree, TreeError};


/// Per-node phylogenetic payload.
///
/// `branch_length` is the distance to the parent; `None` means unset, which
/// is distinct from an explicit `0.0` (an unset length is omitted from the
/// Newick form entirely). `weight`, `branch_sum` and `tip_distance` start at
/// zero and are filled in by the engines in [crate::weights] and
/// [PhyloTree::set_tip_distances].
#[derive(Debug, Clone, PartialEq)]
pub struct Clade<L> {
    pub label: Option<L>,
    pub branch_length: Option<f64>,
    pub weight: f64,
    pub branch_sum: f64,
    pub tip_distance: f64,
}

impl<L> Clade<L> {
    pub fn new(label: L) -> Self {
        Clade {
            label: Some(label),
            branch_length: None,
            weight: 0.0,
            branch_sum: 0.0,
            tip_distance: 0.0,
        }
    }

    pub fn unlabeled() -> Self {
        Clade {
            label: None,
            branch_length: None,
            weight: 0.0,
            branch_sum: 0.0,
            tip_distance: 0.0,
        }
    }

    pub fn with_branch_length(mut self, branch_length: f64) -> Self {
        self.branch_length = Some(branch_length);
        self
    }
}

impl<L> Default for Clade<L> {
    fn default() -> Self {
        Clade::unlabeled()
    }
}

/// A tree whose nodes carry [Clade] payloads.
pub type PhyloTree<L> = Tree<Clade<L>>;

impl<L> Tree<Clade<L>> {
    fn branch_length_or_zero(&self, id: NodeId) -> Result<f64, TreeError> {
        Ok(self.data(id)?.branch_length.unwrap_or(0.0))
    }

    /// Sum of branch lengths along the unique path between `a` and `b`,
    /// found via their last common ancestor. Unset branch lengths count as
    /// zero.
    ///
    /// Returns `Ok(None)` when the nodes share no ancestor (disconnected
    /// trees of the arena forest); that is a normal outcome, not an error.
    /// Stale or foreign handles are an error.
    pub fn distance(&self, a: NodeId, b: NodeId) -> Result<Option<f64>, TreeError> {
        let lca = match self.last_common_ancestor(a, b)? {
            Some(lca) => lca,
            None => return Ok(None),
        };
        let mut total = 0.0;
        for endpoint in [a, b] {
            let mut current = endpoint;
            while current != lca {
                total += self.branch_length_or_zero(current)?;
                current = self
                    .parent(current)?
                    .expect("path to the common ancestor cannot leave the tree");
            }
        }
        Ok(Some(total))
    }

    /// Removes an internal node, reattaching its children to its former
    /// parent at the position the node occupied. With `add_lengths`, the
    /// collapsed node's branch length is added onto each child's.
    ///
    /// The root (no parent) and leaves cannot be collapsed.
    pub fn collapse(&mut self, id: NodeId, add_lengths: bool) -> Result<(), TreeError> {
        let parent = self.parent(id)?.ok_or(TreeError::Detached(id))?;
        if self.get(id)?.is_leaf() {
            return Err(TreeError::NotInternal(id));
        }
        let pos = self.sibling_index(id)?;
        let collapsed_length = self.branch_length_or_zero(id)?;
        let children: Vec<NodeId> = self.children(id)?.to_vec();
        for (offset, &child) in children.iter().enumerate() {
            if add_lengths {
                let child_length = self.branch_length_or_zero(child)?;
                self.data_mut(child)?.branch_length = Some(child_length + collapsed_length);
            }
            self.insert_at(parent, pos + offset, child)?;
        }
        self.discard(id)
    }

    /// Fills `tip_distance` on every node of the subtree: the maximum
    /// branch-length-weighted distance to any descendant leaf (zero for
    /// leaves).
    pub fn set_tip_distances(&mut self, root: NodeId) -> Result<(), TreeError> {
        let order: Vec<NodeId> = self.descendants_post(root)?.collect();
        for id in order {
            let children: Vec<NodeId> = self.children(id)?.to_vec();
            let mut tip_distance: f64 = 0.0;
            for child in children {
                let below = self.data(child)?.tip_distance + self.branch_length_or_zero(child)?;
                tip_distance = tip_distance.max(below);
            }
            self.data_mut(id)?.tip_distance = tip_distance;
        }
        Ok(())
    }

    /// Rescales branch lengths in place to integer values no larger than
    /// `max_length`.
    ///
    /// In the default mode every set branch length is scaled and rounded
    /// independently. In `ultrametric` mode the scaled heights are assigned
    /// bottom-up: each internal node takes the smallest integer height that
    /// covers all of its children, and each child's branch length becomes
    /// the difference of the two heights, so every root-to-leaf path sums to
    /// the same total.
    pub fn scale_branch_lengths(
        &mut self,
        root: NodeId,
        max_length: f64,
        ultrametric: bool,
    ) -> Result<(), TreeError> {
        self.set_tip_distances(root)?;
        let height = self.data(root)?.tip_distance;
        if height <= 0.0 {
            return Ok(());
        }
        let scale = max_length / height;

        if !ultrametric {
            let order: Vec<NodeId> = self.descendants(root)?.collect();
            for id in order {
                if let Some(length) = self.data(id)?.branch_length {
                    self.data_mut(id)?.branch_length = Some((length * scale).round());
                }
            }
            return Ok(());
        }

        // Integer height of each visited subtree root, keyed by handle.
        let mut heights: HashMap<NodeId, f64> = HashMap::new();
        let order: Vec<NodeId> = self.descendants_post(root)?.collect();
        for id in order {
            let children: Vec<NodeId> = self.children(id)?.to_vec();
            if children.is_empty() {
                heights.insert(id, 0.0);
                continue;
            }
            let mut reach: f64 = 0.0;
            for &child in &children {
                let below = heights[&child] + self.branch_length_or_zero(child)? * scale;
                reach = reach.max(below);
            }
            let height = reach.ceil();
            for &child in &children {
                self.data_mut(child)?.branch_length = Some(height - heights[&child]);
            }
            heights.insert(id, height);
        }
        Ok(())
    }

    /// Weights of all labeled leaves below `root`, keyed by label.
    ///
    /// Meaningful after [crate::weights::set_weights] has run from `root`,
    /// at which point the values sum to 1.0 up to floating-point error.
    pub fn leaf_weights(&self, root: NodeId) -> Result<HashMap<L, f64>, TreeError>
    where
        L: Clone + Eq + std::hash::Hash,
    {
        let mut weights = HashMap::new();
        for id in self.traverse(root, false, false)? {
            let clade = self.data(id)?;
            if let Some(label) = &clade.label {
                weights.insert(label.clone(), clade.weight);
            }
        }
        Ok(weights)
    }
}

impl<L: Display> Tree<Clade<L>> {
    /// Serializes the subtree at `root` to
    /// `"(child1,child2,...)label:branchlength"` form. The root's own branch
    /// length is never printed, and unset branch lengths are omitted.
    pub fn to_newick(&self, root: NodeId) -> Result<String, TreeError> {
        newick::to_newick(self, root)
    }
}
