//! Read-only views of a searched tree: training dumps, the engine info line,
//! principal variations, per-child tables and Graphviz output.

use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;

use engine_core::Position;
use serde::{Deserialize, Serialize};

use crate::config::MctsConfig;
use crate::node::NodeId;
use crate::policy::{best_child, pruned_visits};
use crate::tree::MctsTree;

/// Training record of one searched node.
///
/// Serializes as the tuple `(sum_visits, q, [(move, visits), ...])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DumpTuple", from = "DumpTuple")]
pub struct Dump {
    /// Sum of the recorded child visit counts
    pub sum_visits: u32,
    /// Mean value of the node for its side to move
    pub q: f32,
    /// Child visit counts in move order, keyed by move identifier
    pub distribution: Vec<(String, u32)>,
}

type DumpTuple = (u32, f32, Vec<(String, u32)>);

impl From<Dump> for DumpTuple {
    fn from(dump: Dump) -> Self {
        (dump.sum_visits, dump.q, dump.distribution)
    }
}

impl From<DumpTuple> for Dump {
    fn from((sum_visits, q, distribution): DumpTuple) -> Self {
        Self {
            sum_visits,
            q,
            distribution,
        }
    }
}

impl Dump {
    /// Degenerate record for a move played without search, e.g. a proven
    /// mate: one visit on `mv` with certain value.
    pub fn certain<M: fmt::Display>(mv: M) -> Self {
        Self {
            sum_visits: 1,
            q: 1.0,
            distribution: vec![(mv.to_string(), 1)],
        }
    }
}

/// Training record for `node`.
///
/// With `config.target_pruning` the forced visits are pruned first (see
/// [`pruned_visits`]); the tree itself is never modified. With `remove_zeros`
/// children left with zero visits are omitted.
pub fn dump<P: Position>(
    tree: &MctsTree<P>,
    node: NodeId,
    config: &MctsConfig,
    remove_zeros: bool,
) -> Dump {
    let children = tree.children_of(node);
    let visits: Vec<u32> = if config.target_pruning {
        pruned_visits(tree, node, config.c_base, config.c_init)
    } else {
        children.iter().map(|&c| tree.get(c).visit_count).collect()
    };

    let distribution: Vec<(String, u32)> = children
        .iter()
        .zip(visits)
        .filter(|&(_, n)| !remove_zeros || n > 0)
        .filter_map(|(&child, n)| tree.get(child).mv.map(|mv| (mv.to_string(), n)))
        .collect();

    Dump {
        sum_visits: distribution.iter().map(|&(_, n)| n).sum(),
        q: tree.get(node).mean_value(),
        distribution,
    }
}

/// Most-visited line from `node`, following `best_child` until a leaf.
pub fn principal_variation<P: Position>(tree: &MctsTree<P>, node: NodeId) -> Vec<P::Move> {
    let mut pv = Vec::new();
    let mut current = node;
    while let Some(child) = best_child(tree, current) {
        let child_node = tree.get(child);
        if child_node.visit_count == 0 {
            break;
        }
        match child_node.mv {
            Some(mv) => pv.push(mv),
            None => break,
        }
        current = child;
    }
    pv
}

/// Snapshot for the engine info line.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchInfo {
    /// Length of the principal variation
    pub depth: usize,
    /// Live nodes in the tree
    pub nodes: usize,
    /// Budget usage in permille
    pub hashfull: u32,
    /// Expected score of the best move for the side to move at the root
    pub winrate: f32,
    /// Principal variation as move identifiers
    pub pv: Vec<String>,
}

impl fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "info depth {} nodes {} hashfull {} score winrate {:.3} pv {}",
            self.depth,
            self.nodes,
            self.hashfull,
            self.winrate,
            self.pv.join(" ")
        )
    }
}

/// Info line data for `root`.
pub fn info<P: Position>(tree: &MctsTree<P>, root: NodeId) -> SearchInfo {
    let pv: Vec<String> = principal_variation(tree, root)
        .iter()
        .map(ToString::to_string)
        .collect();

    let winrate = match best_child(tree, root).map(|c| tree.get(c)) {
        Some(child) if child.visit_count > 0 => 1.0 - child.mean_value(),
        _ => tree.get(root).mean_value(),
    };

    SearchInfo {
        depth: pv.len(),
        nodes: tree.len(),
        hashfull: (tree.get_usage() * 1000.0) as u32,
        winrate,
        pv,
    }
}

/// Statistics of one child, seen from the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStats {
    pub mv: String,
    pub visits: u32,
    pub forced_visits: u32,
    pub prior: f32,
    /// Child's own evaluation, from the parent's side
    pub value: f32,
    /// Mean value from the parent's side (0 when unvisited)
    pub q: f32,
}

impl fmt::Display for ChildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>8} N:{:>6} F:{:>4} P:{:.4} V:{:.4} Q:{:.4}",
            self.mv, self.visits, self.forced_visits, self.prior, self.value, self.q
        )
    }
}

/// Per-child table for `node`, in move order.
pub fn child_stats<P: Position>(tree: &MctsTree<P>, node: NodeId) -> Vec<ChildStats> {
    tree.children_of(node)
        .iter()
        .filter_map(|&id| {
            let child = tree.get(id);
            let mv = child.mv?;
            Some(ChildStats {
                mv: mv.to_string(),
                visits: child.visit_count,
                forced_visits: child.forced_visits,
                prior: child.prior,
                value: if child.is_evaluated {
                    1.0 - child.value
                } else {
                    0.0
                },
                q: if child.visit_count > 0 {
                    1.0 - child.mean_value()
                } else {
                    0.0
                },
            })
        })
        .collect()
}

/// Multi-line summary of `root`: budget usage, playouts and the best child.
pub fn summary<P: Position>(tree: &MctsTree<P>, root: NodeId) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "usage: {:.2}%", tree.get_usage() * 100.0);
    let _ = writeln!(out, "playouts: {}", tree.get_playouts(root, false));

    let best = best_child(tree, root)
        .and_then(|b| tree.children_of(root).iter().position(|&c| c == b))
        .and_then(|i| child_stats(tree, root).into_iter().nth(i));
    match best {
        Some(stats) => {
            let _ = writeln!(out, "bestmove: {}", stats);
        }
        None => {
            let _ = writeln!(out, "bestmove: resign");
        }
    }
    out
}

/// Graphviz dot rendering of the `node_num` most visited nodes under `root`.
///
/// Nodes are taken best-first by visit count, so the result is always a
/// connected subtree containing the root.
pub fn visualize<P: Position>(tree: &MctsTree<P>, root: NodeId, node_num: usize) -> String {
    let mut selected: Vec<NodeId> = Vec::new();
    let mut frontier = vec![root];
    while selected.len() < node_num {
        let Some((index, _)) = frontier
            .iter()
            .enumerate()
            .max_by_key(|&(i, &id)| (tree.get(id).visit_count, std::cmp::Reverse(i)))
        else {
            break;
        };
        let id = frontier.swap_remove(index);
        selected.push(id);
        frontier.extend(tree.children_of(id));
    }
    let included: HashSet<NodeId> = selected.iter().copied().collect();

    let mut out = String::from("digraph mcts {\n    node [shape=box];\n");
    for &id in &selected {
        let node = tree.get(id);
        let label = match node.mv {
            Some(mv) => mv.to_string(),
            None => "root".to_string(),
        };
        let _ = writeln!(
            out,
            "    n{} [label=\"{}\\nN={} Q={:.3} P={:.3}\"];",
            id.0,
            label,
            node.visit_count,
            node.mean_value(),
            node.prior
        );
        if node.parent.is_some() && included.contains(&node.parent) {
            let _ = writeln!(out, "    n{} -> n{};", node.parent.0, id.0);
        }
    }
    out.push_str("}\n");
    out
}
