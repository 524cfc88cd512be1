//! MCTS tree node representation.
//!
//! Each node represents a position reached by playing `mv` from the parent.
//! Edge statistics live on the child: N, W, P and the virtual loss of the move
//! leading to a node are all stored on that node.

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
///
/// Values are win probabilities in `[0, 1]` from the perspective of the side
/// to move at this node.
#[derive(Debug, Clone)]
pub struct MctsNode<M> {
    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// Move that led to this node from parent (None for a fresh root)
    pub mv: Option<M>,

    /// Number of completed backpropagations through this node
    pub visit_count: u32,

    /// Sum of values backpropagated through this node.
    /// Q = value_sum / visit_count
    pub value_sum: f32,

    /// Prior probability of `mv` from the parent's policy
    pub prior: f32,

    /// This node's own evaluation (network or game outcome)
    pub value: f32,

    /// In-flight selections through this node in the current round
    pub virtual_loss: u32,

    /// Visits that came from forced playouts rather than PUCT
    pub forced_visits: u32,

    /// Whether `value` has been set
    pub is_evaluated: bool,

    /// Whether the position is terminal. Terminal nodes are never expanded.
    pub is_terminal: bool,

    /// Children in move-generation order. Empty until expanded.
    pub children: Vec<NodeId>,
}

impl<M> MctsNode<M> {
    /// Create a new root node.
    pub fn new_root() -> Self {
        Self::new_child(NodeId::NONE, None, 1.0)
    }

    /// Create a new child node.
    pub fn new_child(parent: NodeId, mv: Option<M>, prior: f32) -> Self {
        Self {
            parent,
            mv,
            visit_count: 0,
            value_sum: 0.0,
            prior,
            value: 0.0,
            virtual_loss: 0,
            forced_visits: 0,
            is_evaluated: false,
            is_terminal: false,
            children: Vec::new(),
        }
    }

    /// Calculate mean value Q = value_sum / visit_count from this node's
    /// perspective. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    /// PUCT score of this node as a child of a parent with `parent_visits`
    /// total visits (real plus virtual).
    ///
    /// ```text
    /// C = (1 + parent_N + c_base) / c_base + c_init
    /// Q = 1 - (W + VL) / (N + VL)      (0 when N + VL == 0)
    /// U = C * P * sqrt(parent_N) / (1 + N + VL)
    /// ```
    ///
    /// `W` is stored from this node's perspective, so the parent sees `1 - W/N`.
    /// Each virtual loss counts as a win for this node, which is a loss for the
    /// parent choosing it.
    #[inline]
    pub fn puct_score(&self, parent_visits: f32, c_base: f32, c_init: f32) -> f32 {
        let vl = self.virtual_loss as f32;
        let n = self.visit_count as f32 + vl;
        let q = if n > 0.0 {
            1.0 - (self.value_sum + vl) / n
        } else {
            0.0
        };
        q + exploration(self.prior, n, parent_visits, c_base, c_init)
    }

    /// Check if this node has been expanded (has children).
    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    /// Check if this is a leaf node (not expanded or terminal).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal || !self.is_expanded()
    }
}

/// Exploration term U of the PUCT formula for a child with `visits` (real
/// plus virtual).
#[inline]
pub fn exploration(prior: f32, visits: f32, parent_visits: f32, c_base: f32, c_init: f32) -> f32 {
    let c = (1.0 + parent_visits + c_base) / c_base + c_init;
    c * prior * parent_visits.sqrt() / (1.0 + visits)
}
