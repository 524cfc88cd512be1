//! MCTS tree structure with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by NodeId indices.
//! The arena has a fixed node budget: slots released when the tree is
//! re-rooted go on a free list and are reused before the Vec grows, and an
//! expansion that would exceed the budget is refused instead of allocating.

use std::mem;

use engine_core::Position;
use tracing::{debug, trace};

use crate::node::{MctsNode, NodeId};

/// Default node budget when none is given.
pub const DEFAULT_CAPACITY: usize = 1 << 20;

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<P: Position> {
    /// Arena storing all nodes, live and free
    nodes: Vec<MctsNode<P::Move>>,

    /// Released slots available for reuse
    free: Vec<NodeId>,

    /// Maximum number of live nodes
    capacity: usize,

    /// Number of live nodes
    live: usize,

    /// Root node index (NONE before the first `set_root`)
    root: NodeId,

    /// Position at the root, used to validate tree reuse
    root_position: Option<P>,
}

impl<P: Position> MctsTree<P> {
    /// Create an empty tree that holds at most `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            capacity: capacity.max(1),
            live: 0,
            root: NodeId::NONE,
            root_position: None,
        }
    }

    /// Create an empty tree sized to roughly `bytes` of node storage.
    pub fn with_memory(bytes: usize) -> Self {
        Self::with_capacity(bytes / Self::node_bytes())
    }

    /// Approximate memory footprint of one node including its entry in the
    /// parent's child list.
    pub fn node_bytes() -> usize {
        mem::size_of::<MctsNode<P::Move>>() + mem::size_of::<NodeId>()
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Position at the current root, if a root has been set.
    pub fn root_position(&self) -> Option<&P> {
        self.root_position.as_ref()
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<P::Move> {
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<P::Move> {
        &mut self.nodes[id.index()]
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the tree holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Node budget.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fraction of the node budget in use, in `[0, 1]`.
    pub fn get_usage(&self) -> f32 {
        self.live as f32 / self.capacity as f32
    }

    /// Check if a node has children.
    #[inline]
    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).is_expanded()
    }

    /// Children of a node in move-generation order.
    #[inline]
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    /// Completed playouts through a node.
    ///
    /// A node's own evaluation counts as its first visit. With
    /// `include_own_evaluation == false` that visit is left out, leaving only
    /// the playouts that went through the node's children.
    pub fn get_playouts(&self, id: NodeId, include_own_evaluation: bool) -> u32 {
        let node = self.get(id);
        if include_own_evaluation || !node.is_evaluated {
            node.visit_count
        } else {
            node.visit_count.saturating_sub(1)
        }
    }

    /// Child of `id` reached by `mv`, if it exists.
    pub fn find_child(&self, id: NodeId, mv: P::Move) -> Option<NodeId> {
        self.children_of(id)
            .iter()
            .copied()
            .find(|&child| self.get(child).mv == Some(mv))
    }

    /// All live nodes of the subtree rooted at `id`, in depth-first order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.get(node).children.iter().rev());
        }
        out
    }

    /// Set the root for a new search and return it.
    ///
    /// With `reuse`, the previous root's child reached by `position`'s last
    /// move is promoted when `position` is exactly that child's position. Its
    /// statistics and subtree are kept and everything else is released.
    /// Otherwise the tree is reset to a single fresh root.
    pub fn set_root(&mut self, position: &P, reuse: bool) -> NodeId {
        if reuse {
            if let Some(child) = self.reusable_child(position) {
                let old_root = self.root;
                self.release_except(old_root, child);
                self.get_mut(child).parent = NodeId::NONE;
                self.root = child;
                self.root_position = Some(position.clone());
                debug!(
                    root_visits = self.get(child).visit_count,
                    nodes = self.live,
                    "reused subtree as new root"
                );
                return child;
            }
        }

        self.reset();
        self.root = self.allocate(MctsNode::new_root());
        self.root_position = Some(position.clone());
        self.root
    }

    fn reusable_child(&self, position: &P) -> Option<NodeId> {
        let previous = self.root_position.as_ref()?;
        let mv = position.last_move()?;
        if self.root.is_none() || previous.apply(mv) != *position {
            return None;
        }
        self.find_child(self.root, mv)
    }

    /// Discard all nodes. With `shrink`, also release the arena's storage.
    pub fn clear(&mut self, shrink: bool) {
        self.reset();
        if shrink {
            self.nodes.shrink_to_fit();
            self.free.shrink_to_fit();
        }
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.live = 0;
        self.root = NodeId::NONE;
        self.root_position = None;
    }

    /// Allocate a node. Callers check the budget first.
    fn allocate(&mut self, node: MctsNode<P::Move>) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Materialize the children of `id` with the given priors.
    ///
    /// All-or-nothing: returns `false` without allocating when the budget
    /// cannot hold every child, leaving `id` an unexpanded leaf.
    pub fn expand(&mut self, id: NodeId, priors: &[(P::Move, f32)]) -> bool {
        if self.live + priors.len() > self.capacity {
            trace!(
                node = id.0,
                children = priors.len(),
                live = self.live,
                capacity = self.capacity,
                "node budget exhausted, expansion refused"
            );
            return false;
        }

        let children: Vec<NodeId> = priors
            .iter()
            .map(|&(mv, prior)| self.allocate(MctsNode::new_child(id, Some(mv), prior)))
            .collect();
        self.get_mut(id).children = children;
        true
    }

    /// Release every node under `root` except the subtree at `keep`.
    fn release_except(&mut self, root: NodeId, keep: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id == keep {
                continue;
            }
            let children = mem::take(&mut self.get_mut(id).children);
            stack.extend(children);
            self.free.push(id);
            self.live -= 1;
        }
    }

    /// Add a virtual loss to every node on `path`.
    pub fn apply_virtual_loss(&mut self, path: &[NodeId]) {
        for &id in path {
            self.get_mut(id).virtual_loss += 1;
        }
    }

    /// Remove one virtual loss from every node on `path`.
    pub fn remove_virtual_loss(&mut self, path: &[NodeId]) {
        for &id in path {
            let node = self.get_mut(id);
            node.virtual_loss = node.virtual_loss.saturating_sub(1);
        }
    }

    /// Backpropagate a leaf value along `path` (root first, leaf last).
    ///
    /// The leaf receives `value`, its parent `1 - value`, and so on,
    /// alternating. Each node gains one visit and loses one virtual loss.
    pub fn backpropagate(&mut self, path: &[NodeId], value: f32) {
        let mut current_value = value;

        for &id in path.iter().rev() {
            let node = self.get_mut(id);
            node.visit_count += 1;
            node.value_sum += current_value;
            node.virtual_loss = node.virtual_loss.saturating_sub(1);

            // Flip for the other player
            current_value = 1.0 - current_value;
        }
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        if self.root.is_none() {
            return TreeStats::default();
        }
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.live,
            capacity: self.capacity,
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.compute_max_depth(self.root),
        }
    }

    fn compute_max_depth(&self, id: NodeId) -> u32 {
        let mut max_depth = 0;
        let mut stack = vec![(id, 0u32)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(self.get(node).children.iter().map(|&c| (c, depth + 1)));
        }
        max_depth
    }
}

impl<P: Position> Default for MctsTree<P> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, Default)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub capacity: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}
