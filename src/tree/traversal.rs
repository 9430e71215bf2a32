//! Stack-based iterators over tree structure.
//!
//! Both iterators use explicit stacks so traversal depth is bounded by heap,
//! not the native call stack.

use crate::tree::arena::{NodeId, Tree};

/// Depth-first iterator over a subtree, created by
/// [Tree::traverse](crate::tree::Tree::traverse).
///
/// With both visit flags set, a node with children is yielded twice: once
/// before its children and once after. A childless node is yielded exactly
/// once no matter the flags, and with both flags cleared only the leaves of
/// the subtree are yielded.
pub struct Traverse<'a, T> {
    tree: &'a Tree<T>,
    // (node, children already expanded)
    stack: Vec<(NodeId, bool)>,
    visit_before: bool,
    visit_after: bool,
}

impl<'a, T> Traverse<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, root: NodeId, visit_before: bool, visit_after: bool) -> Self {
        Traverse {
            tree,
            stack: vec![(root, false)],
            visit_before,
            visit_after,
        }
    }
}

impl<'a, T> Iterator for Traverse<'a, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, expanded)) = self.stack.pop() {
            if expanded {
                if self.visit_after {
                    return Some(id);
                }
                continue;
            }

            let node = match self.tree.get(id) {
                Ok(node) => node,
                // Node was freed mid-iteration; nothing sensible to yield.
                Err(_) => continue,
            };

            if node.is_leaf() {
                return Some(id);
            }

            if self.visit_after {
                self.stack.push((id, true));
            }
            for &child in node.children().iter().rev() {
                self.stack.push((child, false));
            }
            if self.visit_before {
                return Some(id);
            }
        }
        None
    }
}

/// Iterator over a node's ancestors, from immediate parent to root.
pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeId>,
}

impl<'a, T> Ancestors<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, first: Option<NodeId>) -> Self {
        Ancestors { tree, next: first }
    }
}

impl<'a, T> Iterator for Ancestors<'a, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.get(current).ok().and_then(|node| node.parent());
        Some(current)
    }
}
