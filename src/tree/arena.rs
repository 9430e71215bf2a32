//! Slotted arena holding the nodes of an ordered, single-parent tree.
//!
//! Nodes are referenced by [NodeId] handles instead of references, so
//! parent/child back-links are plain indices and cycle checks are handle
//! walks. Freed slots go on an intrusive free list and get reused; a handle
//! to a freed node is rejected with [TreeError::InvalidNode].

use thiserror::Error;

use crate::tree::traversal::{Ancestors, Traverse};

/// Handle to a node in a [Tree] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Slot index of this handle, mainly useful for debug output.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structural-invariant violations and bad-handle conditions.
///
/// All of these are precondition violations: the failed operation leaves the
/// tree unchanged.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0:?} is not in this tree")]
    InvalidNode(NodeId),

    #[error("node {0:?} cannot be made its own parent")]
    SelfParent(NodeId),

    #[error("attaching {child:?} under its descendant {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },

    #[error("{child:?} is already a direct child of {parent:?}")]
    DuplicateChild { child: NodeId, parent: NodeId },

    #[error("node {0:?} has no parent")]
    Detached(NodeId),

    #[error("no child with the requested value under {0:?}")]
    ChildNotFound(NodeId),

    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("node {0:?} has no children")]
    NotInternal(NodeId),
}

/// A node: payload plus ordered child handles and a non-owning parent link.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub data: T,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl<T> Node<T> {
    fn new(data: T) -> Self {
        Node {
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied(Node<T>),
    Vacant { next_free: Option<usize> },
}

/// Arena of [Node]s forming one or more ordered trees.
///
/// The arena may hold several detached subtrees at once (e.g. during
/// bottom-up construction); each node has at most one parent and is owned by
/// exactly one child list. Mutation goes through `&mut self`, so the
/// single-writer discipline is enforced by the borrow checker.
#[derive(Debug, Clone, Default)]
pub struct Tree<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    live: usize,
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Tree {
            slots: Vec::new(),
            free_head: None,
            live: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Tree {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
        }
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Slot::Occupied(_)))
    }

    /// Creates a new detached node holding `data`.
    pub fn insert(&mut self, data: T) -> NodeId {
        let node = Node::new(data);
        self.live += 1;
        match self.free_head {
            Some(index) => {
                self.free_head = match self.slots[index] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at occupied slot"),
                };
                self.slots[index] = Slot::Occupied(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Result<&Node<T>, TreeError> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied(node)) => Ok(node),
            _ => Err(TreeError::InvalidNode(id)),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node<T>, TreeError> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Occupied(node)) => Ok(node),
            _ => Err(TreeError::InvalidNode(id)),
        }
    }

    pub fn data(&self, id: NodeId) -> Result<&T, TreeError> {
        Ok(&self.get(id)?.data)
    }

    pub fn data_mut(&mut self, id: NodeId) -> Result<&mut T, TreeError> {
        Ok(&mut self.get_mut(id)?.data)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(self.get(id)?.children.as_slice())
    }

    pub fn child_count(&self, id: NodeId) -> Result<usize, TreeError> {
        Ok(self.get(id)?.children.len())
    }

    fn free_slot(&mut self, id: NodeId) {
        self.slots[id.0] = Slot::Vacant {
            next_free: self.free_head,
        };
        self.free_head = Some(id.0);
        self.live -= 1;
    }

    /// Rejects attachments that would break the single-parent/acyclic
    /// invariants. `parent` must not be `child` itself or any node below it.
    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.get(child)?;
        self.get(parent)?;
        if parent == child {
            return Err(TreeError::SelfParent(child));
        }
        // Walk up from `parent`; hitting `child` means `parent` sits in
        // `child`'s subtree.
        let mut current = self.get(parent)?.parent;
        while let Some(ancestor) = current {
            if ancestor == child {
                return Err(TreeError::Cycle { child, parent });
            }
            current = self.get(ancestor)?.parent;
        }
        Ok(())
    }

    /// Unlinks `id` from its parent (if any). The subtree stays live.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.get(id)?.parent;
        if let Some(parent) = parent {
            let siblings = &mut self.get_mut(parent)?.children;
            siblings.retain(|&c| c != id);
            self.get_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Appends `child` to the end of `parent`'s child list, detaching it
    /// from any previous parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self.child_count(parent)?;
        self.insert_at(parent, len, child)
    }

    /// Wraps `data` in a fresh node and appends it under `parent`.
    pub fn append_data(&mut self, parent: NodeId, data: T) -> Result<NodeId, TreeError> {
        self.get(parent)?;
        let child = self.insert(data);
        self.append(parent, child)?;
        Ok(child)
    }

    /// Inserts `child` at position `pos` in `parent`'s child list.
    ///
    /// A node that is already a direct child of `parent` is rejected with
    /// [TreeError::DuplicateChild]; a node attached elsewhere is detached
    /// from there first.
    pub fn insert_at(&mut self, parent: NodeId, pos: usize, child: NodeId) -> Result<(), TreeError> {
        self.check_attach(parent, child)?;
        let siblings = &self.get(parent)?.children;
        if siblings.contains(&child) {
            return Err(TreeError::DuplicateChild { child, parent });
        }
        if pos > siblings.len() {
            return Err(TreeError::IndexOutOfRange {
                index: pos,
                len: siblings.len(),
            });
        }
        self.detach(child)?;
        self.get_mut(parent)?.children.insert(pos, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Appends every node of `children` under `parent`, in order.
    pub fn extend<I>(&mut self, parent: NodeId, children: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        for child in children {
            self.append(parent, child)?;
        }
        Ok(())
    }

    /// Detaches and returns the first child of `parent` whose payload equals
    /// `value`.
    pub fn remove(&mut self, parent: NodeId, value: &T) -> Result<NodeId, TreeError>
    where
        T: PartialEq,
    {
        let found = self
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| match self.get(c) {
                Ok(node) => node.data == *value,
                Err(_) => false,
            });
        match found {
            Some(child) => {
                self.detach(child)?;
                Ok(child)
            }
            None => Err(TreeError::ChildNotFound(parent)),
        }
    }

    /// Detaches `child` from `parent` by identity.
    pub fn remove_node(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if !self.get(parent)?.children.contains(&child) {
            return Err(TreeError::ChildNotFound(parent));
        }
        self.detach(child)
    }

    /// Detaches and returns the child of `parent` at position `index`.
    pub fn pop(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let siblings = &self.get(parent)?.children;
        let len = siblings.len();
        let child = *siblings
            .get(index)
            .ok_or(TreeError::IndexOutOfRange { index, len })?;
        self.detach(child)?;
        Ok(child)
    }

    /// Detaches and returns the last child of `parent`.
    pub fn pop_last(&mut self, parent: NodeId) -> Result<NodeId, TreeError> {
        let len = self.child_count(parent)?;
        if len == 0 {
            return Err(TreeError::IndexOutOfRange { index: 0, len: 0 });
        }
        self.pop(parent, len - 1)
    }

    /// Replaces `parent`'s entire child list (the slice-assignment analog).
    ///
    /// All replacements are validated before anything is mutated, so a
    /// failure leaves the previous children in place.
    pub fn set_children(&mut self, parent: NodeId, new: Vec<NodeId>) -> Result<(), TreeError> {
        for (i, &child) in new.iter().enumerate() {
            self.check_attach(parent, child)?;
            if new[..i].contains(&child) {
                return Err(TreeError::DuplicateChild { child, parent });
            }
        }
        let old = std::mem::take(&mut self.get_mut(parent)?.children);
        for child in old {
            self.get_mut(child)?.parent = None;
        }
        for child in new {
            self.detach(child)?;
            self.get_mut(parent)?.children.push(child);
            self.get_mut(child)?.parent = Some(parent);
        }
        Ok(())
    }

    /// Reassigns the parent of `child`. `None` detaches it; `Some(p)`
    /// detaches it from its current parent and appends it under `p`, with the
    /// usual self/cycle checks.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), TreeError> {
        match parent {
            None => self.detach(child),
            Some(parent) => {
                self.check_attach(parent, child)?;
                self.detach(child)?;
                self.get_mut(parent)?.children.push(child);
                self.get_mut(child)?.parent = Some(parent);
                Ok(())
            }
        }
    }

    /// Position of `id` among its parent's children.
    pub fn sibling_index(&self, id: NodeId) -> Result<usize, TreeError> {
        let parent = self.get(id)?.parent.ok_or(TreeError::Detached(id))?;
        let pos = self
            .get(parent)?
            .children
            .iter()
            .position(|&c| c == id)
            .expect("child list of parent must contain the node");
        Ok(pos)
    }

    /// Moves `id` to position `pos` among its parent's children.
    pub fn set_sibling_index(&mut self, id: NodeId, pos: usize) -> Result<(), TreeError> {
        let parent = self.get(id)?.parent.ok_or(TreeError::Detached(id))?;
        let len = self.child_count(parent)?;
        if pos >= len {
            return Err(TreeError::IndexOutOfRange { index: pos, len });
        }
        let siblings = &mut self.get_mut(parent)?.children;
        let current = siblings
            .iter()
            .position(|&c| c == id)
            .expect("child list of parent must contain the node");
        siblings.remove(current);
        siblings.insert(pos, id);
        Ok(())
    }

    /// Iterator over the ancestors of `id`, from its immediate parent up to
    /// the root. Does not yield `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Result<Ancestors<'_, T>, TreeError> {
        let first = self.get(id)?.parent;
        Ok(Ancestors::new(self, first))
    }

    /// Topmost node reachable from `id` by walking parent links.
    pub fn root_of(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let mut current = id;
        while let Some(parent) = self.get(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    /// Chain of handles from `id` up to and including its root.
    fn path_to_root(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = vec![id];
        let mut current = self.get(id)?.parent;
        while let Some(ancestor) = current {
            path.push(ancestor);
            current = self.get(ancestor)?.parent;
        }
        Ok(path)
    }

    /// Deepest node that lies on both ancestor chains, the chains including
    /// `a` and `b` themselves. `None` when the nodes live in different trees
    /// of the arena forest.
    pub fn last_common_ancestor(
        &self,
        a: NodeId,
        b: NodeId,
    ) -> Result<Option<NodeId>, TreeError> {
        let path_a = self.path_to_root(a)?;
        let path_b = self.path_to_root(b)?;
        let mut shared = None;
        for (&x, &y) in path_a.iter().rev().zip(path_b.iter().rev()) {
            if x != y {
                break;
            }
            shared = Some(x);
        }
        Ok(shared)
    }

    /// [last_common_ancestor](Self::last_common_ancestor), but comparing the
    /// chains by payload equality instead of handle identity. Returns the
    /// matching node from `a`'s chain.
    pub fn last_common_ancestor_by_value(
        &self,
        a: NodeId,
        b: NodeId,
    ) -> Result<Option<NodeId>, TreeError>
    where
        T: PartialEq,
    {
        let path_a = self.path_to_root(a)?;
        let path_b = self.path_to_root(b)?;
        let mut shared = None;
        for (&x, &y) in path_a.iter().rev().zip(path_b.iter().rev()) {
            if self.get(x)?.data != self.get(y)?.data {
                break;
            }
            shared = Some(x);
        }
        Ok(shared)
    }

    /// Depth-first traversal of the subtree at `id`.
    ///
    /// `visit_before`/`visit_after` control whether a node with children is
    /// yielded before its children, after them, or both. A childless node is
    /// yielded exactly once regardless of the flags.
    pub fn traverse(
        &self,
        id: NodeId,
        visit_before: bool,
        visit_after: bool,
    ) -> Result<Traverse<'_, T>, TreeError> {
        self.get(id)?;
        Ok(Traverse::new(self, id, visit_before, visit_after))
    }

    /// Pre-order traversal of the subtree at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> Result<Traverse<'_, T>, TreeError> {
        self.traverse(id, true, false)
    }

    /// Post-order traversal of the subtree at `id`, including `id`.
    pub fn descendants_post(&self, id: NodeId) -> Result<Traverse<'_, T>, TreeError> {
        self.traverse(id, false, true)
    }

    /// Copies the subtree at `id` into a fully independent, detached subtree
    /// in the same arena, cloning every payload. Iterative, so copy depth is
    /// not limited by the native stack.
    pub fn deep_copy(&mut self, id: NodeId) -> Result<NodeId, TreeError>
    where
        T: Clone,
    {
        let data = self.get(id)?.data.clone();
        let copy_root = self.insert(data);
        let mut stack = vec![(id, copy_root)];
        while let Some((src, dst)) = stack.pop() {
            let children: Vec<NodeId> = self.get(src)?.children.clone();
            for child in children {
                let data = self.get(child)?.data.clone();
                let copy = self.insert(data);
                // Fresh nodes cannot alias or cycle, link them directly.
                self.get_mut(dst)?.children.push(copy);
                self.get_mut(copy)?.parent = Some(dst);
                stack.push((child, copy));
            }
        }
        Ok(copy_root)
    }

    /// Detaches and frees every descendant of `id`, keeping `id` itself.
    /// Frees slots iteratively for early reclamation of large subtrees.
    pub fn clear(&mut self, id: NodeId) -> Result<(), TreeError> {
        let mut stack = std::mem::take(&mut self.get_mut(id)?.children);
        while let Some(current) = stack.pop() {
            stack.append(&mut self.get_mut(current)?.children);
            self.free_slot(current);
        }
        Ok(())
    }

    /// Detaches `id` from its parent and frees its entire subtree.
    pub fn discard(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.detach(id)?;
        self.clear(id)?;
        self.free_slot(id);
        Ok(())
    }
}
