//! Move-selection policies over a searched node.
//!
//! Final move choice (`best_move`, `softmax_sample`), the forced-playout
//! rule used during selection at the root, target pruning of forced visits,
//! and root Dirichlet noise.

use engine_core::Position;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Gamma;

use crate::node::{exploration, NodeId};
use crate::search::SearchError;
use crate::tree::MctsTree;

/// Outcome of choosing a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveChoice<M> {
    /// A move chosen by the search.
    Normal(M),
    /// No legal move is available.
    Resign,
    /// A move proven to force a win.
    Checkmate(M),
}

impl<M: Copy> MoveChoice<M> {
    /// The move to play, if any.
    pub fn mv(&self) -> Option<M> {
        match *self {
            MoveChoice::Normal(mv) | MoveChoice::Checkmate(mv) => Some(mv),
            MoveChoice::Resign => None,
        }
    }

    pub fn is_resign(&self) -> bool {
        matches!(self, MoveChoice::Resign)
    }
}

/// Child with the most visits. Ties go to the first in move order.
pub fn best_child<P: Position>(tree: &MctsTree<P>, node: NodeId) -> Option<NodeId> {
    let mut best: Option<(NodeId, u32)> = None;
    for &child in tree.children_of(node) {
        let visits = tree.get(child).visit_count;
        match best {
            Some((_, best_visits)) if visits <= best_visits => {}
            _ => best = Some((child, visits)),
        }
    }
    best.map(|(id, _)| id)
}

fn choice_of<P: Position>(tree: &MctsTree<P>, child: Option<NodeId>) -> MoveChoice<P::Move> {
    match child.and_then(|id| tree.get(id).mv) {
        Some(mv) => MoveChoice::Normal(mv),
        None => MoveChoice::Resign,
    }
}

/// Move with the highest visit count at `node`, or `Resign` when the node
/// has no children.
pub fn best_move<P: Position>(tree: &MctsTree<P>, node: NodeId) -> MoveChoice<P::Move> {
    choice_of(tree, best_child(tree, node))
}

/// Sample a move with probability `N_i^(1/T) / sum_j N_j^(1/T)`.
///
/// `temperature <= 0` is greedy (`best_move`). When no child has been
/// visited the priors are used as weights instead.
pub fn softmax_sample<P, R>(
    tree: &MctsTree<P>,
    node: NodeId,
    temperature: f32,
    rng: &mut R,
) -> MoveChoice<P::Move>
where
    P: Position,
    R: Rng + ?Sized,
{
    let children = tree.children_of(node);
    if children.is_empty() {
        return MoveChoice::Resign;
    }
    if temperature <= 0.0 {
        return best_move(tree, node);
    }

    let max_visits = children
        .iter()
        .map(|&c| tree.get(c).visit_count)
        .max()
        .unwrap_or(0);

    let weights: Vec<f64> = if max_visits > 0 {
        // Scale by the maximum so large counts cannot overflow the power.
        let exponent = 1.0 / temperature as f64;
        children
            .iter()
            .map(|&c| (tree.get(c).visit_count as f64 / max_visits as f64).powf(exponent))
            .collect()
    } else {
        children
            .iter()
            .map(|&c| tree.get(c).prior.max(0.0) as f64)
            .collect()
    };

    match WeightedIndex::new(&weights) {
        Ok(dist) => choice_of(tree, Some(children[dist.sample(rng)])),
        Err(_) => best_move(tree, node),
    }
}

/// First child (in move order) still owed forced playouts:
/// `N < sqrt(k * P * parent_N)`, counting real visits only.
///
/// An unexpanded child already reserved by another slot of the batch is
/// skipped, so a batch does not pile onto one pending leaf.
pub fn forced_child<P: Position>(
    tree: &MctsTree<P>,
    node: NodeId,
    parent_visits: f32,
    k: f32,
) -> Option<NodeId> {
    tree.children_of(node).iter().copied().find(|&child| {
        let c = tree.get(child);
        if !c.is_expanded() && c.virtual_loss > 0 {
            return false;
        }
        let threshold = (k * c.prior * parent_visits).sqrt();
        (c.visit_count as f32) < threshold
    })
}

/// Per-child visit counts with forced playouts pruned back out.
///
/// The most visited child is untouched. Every other child gives back up to
/// its forced visits, one at a time, while its PUCT score with the reduced
/// count stays below the best child's score. Mean values are held fixed.
pub fn pruned_visits<P: Position>(
    tree: &MctsTree<P>,
    node: NodeId,
    c_base: f32,
    c_init: f32,
) -> Vec<u32> {
    let children = tree.children_of(node);
    let Some(best) = best_child(tree, node) else {
        return Vec::new();
    };

    let parent_visits = tree.get(node).visit_count as f32;
    let best_score = tree.get(best).puct_score(parent_visits, c_base, c_init);

    children
        .iter()
        .map(|&id| {
            let child = tree.get(id);
            if id == best {
                return child.visit_count;
            }

            let q = if child.visit_count > 0 {
                1.0 - child.mean_value()
            } else {
                0.0
            };
            let mut visits = child.visit_count;
            for _ in 0..child.forced_visits {
                if visits == 0 {
                    break;
                }
                let reduced = visits - 1;
                let reduced_q = if reduced > 0 { q } else { 0.0 };
                let score = reduced_q
                    + exploration(child.prior, reduced as f32, parent_visits, c_base, c_init);
                if score >= best_score {
                    break;
                }
                visits = reduced;
            }
            visits
        })
        .collect()
}

/// Generate Dirichlet-distributed noise using Gamma variates.
pub fn dirichlet_noise<R: Rng + ?Sized>(
    n: usize,
    alpha: f32,
    rng: &mut R,
) -> Result<Vec<f32>, SearchError> {
    let gamma = Gamma::new(alpha as f64, 1.0).map_err(|e| {
        SearchError::InvalidConfig(format!("dirichlet_alpha {}: {}", alpha, e))
    })?;
    let mut samples: Vec<f32> = (0..n).map(|_| gamma.sample(rng) as f32).collect();

    // Normalize
    let sum: f32 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    } else if n > 0 {
        samples.fill(1.0 / n as f32);
    }

    Ok(samples)
}

/// Blend Dirichlet noise into the priors of `node`'s children:
/// `P' = (1 - frac) * P + frac * noise`.
pub fn add_dirichlet_noise<P, R>(
    tree: &mut MctsTree<P>,
    node: NodeId,
    alpha: f32,
    frac: f32,
    rng: &mut R,
) -> Result<(), SearchError>
where
    P: Position,
    R: Rng + ?Sized,
{
    let children = tree.children_of(node).to_vec();
    if children.is_empty() {
        return Ok(());
    }

    let noise = dirichlet_noise(children.len(), alpha, rng)?;
    for (child, eta) in children.into_iter().zip(noise) {
        let node = tree.get_mut(child);
        node.prior = (1.0 - frac) * node.prior + frac * eta;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{expanded_root, Branching};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const C_BASE: f32 = 19652.0;
    const C_INIT: f32 = 1.25;

    fn set_visits(tree: &mut MctsTree<Branching>, root: NodeId, visits: &[u32]) {
        let children = tree.children_of(root).to_vec();
        let mut total = 1;
        for (&child, &n) in children.iter().zip(visits) {
            let node = tree.get_mut(child);
            node.visit_count = n;
            node.value_sum = n as f32 * 0.5;
            total += n;
        }
        let node = tree.get_mut(root);
        node.visit_count = total;
        node.value_sum = total as f32 * 0.5;
        node.is_evaluated = true;
    }

    #[test]
    fn test_move_choice() {
        assert_eq!(MoveChoice::Normal(3u8).mv(), Some(3));
        assert_eq!(MoveChoice::Checkmate(4u8).mv(), Some(4));
        assert_eq!(MoveChoice::<u8>::Resign.mv(), None);
        assert!(MoveChoice::<u8>::Resign.is_resign());
    }

    #[test]
    fn test_best_move_highest_visits() {
        let (mut tree, root) = expanded_root(3);
        set_visits(&mut tree, root, &[4, 9, 2]);
        assert_eq!(best_move(&tree, root), MoveChoice::Normal(1));
    }

    #[test]
    fn test_best_move_ties_take_first() {
        let (mut tree, root) = expanded_root(3);
        set_visits(&mut tree, root, &[2, 5, 5]);
        assert_eq!(best_move(&tree, root), MoveChoice::Normal(1));

        let (tree, root) = expanded_root(3);
        assert_eq!(best_move(&tree, root), MoveChoice::Normal(0));
    }

    #[test]
    fn test_best_move_without_children_resigns() {
        let mut tree = MctsTree::with_capacity(10);
        let root = tree.set_root(&Branching::new(3, 4), false);
        assert_eq!(best_move(&tree, root), MoveChoice::Resign);

        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(softmax_sample(&tree, root, 1.0, &mut rng), MoveChoice::Resign);
    }

    #[test]
    fn test_softmax_sampling_law() {
        let (mut tree, root) = expanded_root(2);
        set_visits(&mut tree, root, &[30, 70]);

        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let trials = 20_000;
        let mut first = 0;
        for _ in 0..trials {
            if softmax_sample(&tree, root, 1.0, &mut rng) == MoveChoice::Normal(0) {
                first += 1;
            }
        }

        let freq = first as f64 / trials as f64;
        assert!((freq - 0.3).abs() < 0.02, "frequency {}", freq);
    }

    #[test]
    fn test_softmax_low_temperature_sharpens() {
        let (mut tree, root) = expanded_root(2);
        set_visits(&mut tree, root, &[30, 70]);

        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let first = (0..5_000)
            .filter(|_| softmax_sample(&tree, root, 0.25, &mut rng) == MoveChoice::Normal(0))
            .count();
        // (0.3^4) / (0.3^4 + 0.7^4) is about 0.0326
        let freq = first as f64 / 5_000.0;
        assert!(freq < 0.06, "frequency {}", freq);

        assert_eq!(softmax_sample(&tree, root, 0.0, &mut rng), MoveChoice::Normal(1));
    }

    #[test]
    fn test_softmax_unvisited_uses_priors() {
        let (mut tree, root) = expanded_root(2);
        let children = tree.children_of(root).to_vec();
        tree.get_mut(children[0]).prior = 0.0;
        tree.get_mut(children[1]).prior = 1.0;

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(softmax_sample(&tree, root, 1.0, &mut rng), MoveChoice::Normal(1));
        }
    }

    #[test]
    fn test_forced_child_threshold() {
        let (mut tree, root) = expanded_root(2);
        let children = tree.children_of(root).to_vec();
        tree.get_mut(children[0]).prior = 0.5;
        tree.get_mut(children[1]).prior = 0.5;
        tree.get_mut(children[0]).visit_count = 10;
        tree.get_mut(children[1]).visit_count = 2;

        // sqrt(2 * 0.5 * 100) = 10: child 0 has enough, child 1 is owed visits
        assert_eq!(forced_child(&tree, root, 100.0, 2.0), Some(children[1]));

        // Virtual loss on an expanded child does not count toward the
        // threshold (the child list only marks it expanded)
        tree.get_mut(children[1]).virtual_loss = 8;
        tree.get_mut(children[1]).visit_count = 9;
        tree.get_mut(children[1]).children = vec![children[0]];
        assert_eq!(forced_child(&tree, root, 100.0, 2.0), Some(children[1]));
    }

    #[test]
    fn test_forced_child_skips_pending_leaf() {
        let (mut tree, root) = expanded_root(3);
        let children = tree.children_of(root).to_vec();

        // Unvisited and unexpanded: the first is owed, until another slot
        // reserves it
        assert_eq!(forced_child(&tree, root, 9.0, 2.0), Some(children[0]));
        tree.get_mut(children[0]).virtual_loss = 1;
        assert_eq!(forced_child(&tree, root, 9.0, 2.0), Some(children[1]));
    }

    #[test]
    fn test_pruned_visits_without_forced_visits_is_identity() {
        let (mut tree, root) = expanded_root(3);
        set_visits(&mut tree, root, &[10, 30, 5]);
        assert_eq!(pruned_visits(&tree, root, C_BASE, C_INIT), vec![10, 30, 5]);
    }

    #[test]
    fn test_pruned_visits_removes_forced_visits() {
        let (mut tree, root) = expanded_root(2);
        set_visits(&mut tree, root, &[90, 10]);
        let children = tree.children_of(root).to_vec();
        tree.get_mut(children[0]).prior = 0.95;
        // Low prior and every playout lost for the parent: all forced visits go
        let weak = tree.get_mut(children[1]);
        weak.prior = 0.05;
        weak.value_sum = 10.0;
        weak.forced_visits = 6;

        let pruned = pruned_visits(&tree, root, C_BASE, C_INIT);
        assert_eq!(pruned, vec![90, 4]);

        // The pruned count keeps the child's PUCT below the best child's.
        let parent = tree.get(root).visit_count as f32;
        let best = tree.get(children[0]).puct_score(parent, C_BASE, C_INIT);
        let reduced = exploration(0.05, 4.0, parent, C_BASE, C_INIT);
        assert!(reduced < best);
    }

    #[test]
    fn test_pruning_stops_when_child_becomes_attractive() {
        let (mut tree, root) = expanded_root(2);
        set_visits(&mut tree, root, &[90, 10]);
        let children = tree.children_of(root).to_vec();
        tree.get_mut(children[0]).prior = 0.5;
        tree.get_mut(children[1]).prior = 0.5;
        tree.get_mut(children[1]).forced_visits = 6;

        // Same Q and prior: any reduction would beat the best child's PUCT.
        assert_eq!(pruned_visits(&tree, root, C_BASE, C_INIT), vec![90, 10]);
    }

    #[test]
    fn test_dirichlet_noise() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let noise = dirichlet_noise(5, 0.3, &mut rng).unwrap();

        let sum: f32 = noise.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(noise.iter().all(|&n| n >= 0.0));

        assert!(dirichlet_noise(5, 0.0, &mut rng).is_err());
    }

    #[test]
    fn test_add_dirichlet_noise_keeps_distribution() {
        let (mut tree, root) = expanded_root(4);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        add_dirichlet_noise(&mut tree, root, 0.34, 0.25, &mut rng).unwrap();

        let priors: Vec<f32> = tree
            .children_of(root)
            .iter()
            .map(|&c| tree.get(c).prior)
            .collect();
        let sum: f32 = priors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        // Every prior keeps at least 75% of its uniform mass
        assert!(priors.iter().all(|&p| p >= 0.75 * 0.25 - 1e-6));
        assert!(priors.iter().any(|&p| (p - 0.25).abs() > 1e-4));
    }
}
