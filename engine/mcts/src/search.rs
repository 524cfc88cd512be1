//! MCTS search implementation.
//!
//! One call to [`MctsSearch::run`] is a search episode:
//! 1. Root setup: re-root or reset the tree, or return immediately when the
//!    root already has enough playouts
//! 2. Root evaluation: evaluate and expand the root, then add Dirichlet noise
//! 3. Batched rounds: select `batch_size` leaves under virtual loss, evaluate
//!    them in one evaluator call, expand, and backpropagate
//! 4. Output: the root handle, read with the `policy` and `diagnostics`
//!    functions
//!
//! Rounds are strictly ordered: every selection of a round happens before its
//! evaluator call, and every result is applied before the next round starts.
//! Stop, memory and time checks happen only between rounds.

use std::time::Instant;

use engine_core::Position;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::MctsConfig;
use crate::diagnostics::{self, Dump, SearchInfo};
use crate::evaluator::{EvalResult, Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::policy::{self, MoveChoice};
use crate::stop::StopToken;
use crate::tree::MctsTree;

/// Rounds between verbose info lines.
pub const INFO_INTERVAL: u32 = 50;

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("Evaluator returned {got} results for a batch of {expected}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("Policy has {got} entries, expected {expected}")]
    PolicySizeMismatch { expected: usize, got: usize },

    #[error("Non-finite value from evaluator: {0}")]
    InvalidValue(f32),

    #[error("Position input has {got} features, expected {expected}")]
    InputSizeMismatch { expected: usize, got: usize },

    #[error("Policy index {index} out of range for policy of size {size}")]
    PolicyIndexOutOfRange { index: usize, size: usize },

    #[error("Invalid search config: {0}")]
    InvalidConfig(String),

    #[error("Ponder thread panicked")]
    PonderPanicked,
}

/// Phase of the current search episode. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    RootSet,
    RootEvaluated,
    Simulating,
    Done,
}

/// Why a search episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// All rounds ran
    #[default]
    Completed,
    /// The root already had enough playouts
    Immediate,
    /// Tree usage crossed the memory threshold or the root could not expand
    MemoryLimit,
    /// The stop token was raised
    Stopped,
    /// The time limit elapsed
    TimeLimit,
    /// The root position is terminal
    TerminalRoot,
}

/// Statistics for one search episode.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Completed simulation rounds
    pub rounds: u32,
    /// Positions sent to the evaluator
    pub evaluations: u32,
    /// Evaluator calls
    pub batches: u32,
    /// Slots whose leaf was terminal
    pub terminal_hits: u32,
    /// Slots whose leaf was already pending in the same round
    pub duplicate_leaves: u32,
    /// Expansions refused by the node budget
    pub refused_expansions: u32,
    pub selection_time_us: u64,
    pub inference_time_us: u64,
    pub expansion_time_us: u64,
    pub backprop_time_us: u64,
    pub total_time_us: u64,
    pub stop_reason: StopReason,
}

/// One batch slot: the path from root to leaf and the leaf's position.
struct Slot<P: Position> {
    path: Vec<NodeId>,
    position: P,
    forced: Option<NodeId>,
}

impl<P: Position> Slot<P> {
    fn leaf(&self) -> NodeId {
        // Paths always start at the root.
        self.path[self.path.len() - 1]
    }
}

/// MCTS search state. Owns the tree, which persists across episodes for
/// reuse.
#[derive(Debug)]
pub struct MctsSearch<P: Position> {
    tree: MctsTree<P>,
    phase: SearchPhase,
    stats: SearchStats,
}

impl<P: Position> MctsSearch<P> {
    pub fn new(tree: MctsTree<P>) -> Self {
        Self {
            tree,
            phase: SearchPhase::Idle,
            stats: SearchStats::default(),
        }
    }

    /// Search over a tree holding at most `nodes` nodes.
    pub fn with_capacity(nodes: usize) -> Self {
        Self::new(MctsTree::with_capacity(nodes))
    }

    /// Search over a tree sized to roughly `bytes` of node storage.
    pub fn with_memory(bytes: usize) -> Self {
        Self::new(MctsTree::with_memory(bytes))
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<P> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut MctsTree<P> {
        &mut self.tree
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Statistics of the last episode.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Discard the tree.
    pub fn clear(&mut self, shrink: bool) {
        self.tree.clear(shrink);
        self.phase = SearchPhase::Idle;
    }

    pub fn best_move(&self, node: NodeId) -> MoveChoice<P::Move> {
        policy::best_move(&self.tree, node)
    }

    pub fn softmax_sample<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        temperature: f32,
        rng: &mut R,
    ) -> MoveChoice<P::Move> {
        policy::softmax_sample(&self.tree, node, temperature, rng)
    }

    /// Training record for `node`, pruned if `config.target_pruning`.
    pub fn dump(&self, node: NodeId, config: &MctsConfig, remove_zeros: bool) -> Dump {
        diagnostics::dump(&self.tree, node, config, remove_zeros)
    }

    pub fn info(&self, node: NodeId) -> SearchInfo {
        diagnostics::info(&self.tree, node)
    }

    /// Run one search episode from `position` and return the root.
    ///
    /// Memory exhaustion, the stop token and the time limit end the episode
    /// early with the statistics gathered so far; they are not errors. The
    /// time limit is checked once per round, so the search can overrun it by
    /// up to one round. Evaluator failures and malformed evaluator output
    /// abort the episode; the failed round's virtual losses are rolled back.
    pub fn run<E, R>(
        &mut self,
        position: &P,
        evaluator: &E,
        config: &MctsConfig,
        rng: &mut R,
        stop: &StopToken,
    ) -> Result<NodeId, SearchError>
    where
        E: Evaluator + ?Sized,
        R: Rng + ?Sized,
    {
        let start = Instant::now();
        self.stats = SearchStats::default();
        self.phase = SearchPhase::Idle;

        let result = self.run_episode(position, evaluator, config, rng, stop, start);

        self.phase = SearchPhase::Done;
        self.stats.total_time_us = start.elapsed().as_micros() as u64;
        if let Ok(root) = result {
            debug!(
                root_visits = self.tree.get(root).visit_count,
                rounds = self.stats.rounds,
                evaluations = self.stats.evaluations,
                nodes = self.tree.len(),
                usage = self.tree.get_usage(),
                reason = ?self.stats.stop_reason,
                "search finished"
            );
            if config.verbose {
                info!("{}", diagnostics::info(&self.tree, root));
            }
        }
        result
    }

    fn run_episode<E, R>(
        &mut self,
        position: &P,
        evaluator: &E,
        config: &MctsConfig,
        rng: &mut R,
        stop: &StopToken,
        start: Instant,
    ) -> Result<NodeId, SearchError>
    where
        E: Evaluator + ?Sized,
        R: Rng + ?Sized,
    {
        config.validate()?;

        // Step 1: set the root
        let root = self.tree.set_root(position, config.reuse_tree);
        self.phase = SearchPhase::RootSet;

        if config.immediate && self.tree.get_playouts(root, true) >= config.simulation_num {
            self.stats.stop_reason = StopReason::Immediate;
            return Ok(root);
        }

        // Step 2: evaluate the root
        self.evaluate_root(root, position, evaluator, config, rng)?;
        self.phase = SearchPhase::RootEvaluated;

        // Step 3: batched rounds
        self.stats.stop_reason = self.simulate(root, position, evaluator, config, stop, start)?;
        Ok(root)
    }

    fn evaluate_root<E, R>(
        &mut self,
        root: NodeId,
        position: &P,
        evaluator: &E,
        config: &MctsConfig,
        rng: &mut R,
    ) -> Result<(), SearchError>
    where
        E: Evaluator + ?Sized,
        R: Rng + ?Sized,
    {
        let node = self.tree.get(root);
        if node.is_expanded() || node.is_terminal {
            return Ok(());
        }

        let moves = position.legal_moves();
        if !node.is_evaluated {
            if let Some(value) = position.terminal_value_with(&moves) {
                let node = self.tree.get_mut(root);
                node.is_terminal = true;
                node.is_evaluated = true;
                node.value = value;
                node.visit_count += 1;
                node.value_sum += value;
                self.stats.terminal_hits += 1;
                return Ok(());
            }
        }

        let input = checked_input(position)?;
        let inference_start = Instant::now();
        let mut results = evaluator.evaluate_batch(&[input.as_slice()])?;
        self.stats.inference_time_us += inference_start.elapsed().as_micros() as u64;
        self.stats.batches += 1;
        self.stats.evaluations += 1;

        if results.len() != 1 {
            return Err(SearchError::BatchSizeMismatch {
                expected: 1,
                got: results.len(),
            });
        }
        let result = results.remove(0);
        check_result::<P>(&result)?;
        let priors = legal_priors::<P>(moves, &result.policy)?;

        // A reused root that was evaluated earlier keeps its statistics and
        // only needs its children.
        let node = self.tree.get_mut(root);
        if !node.is_evaluated {
            let value = result.search_value();
            node.is_evaluated = true;
            node.value = value;
            node.visit_count += 1;
            node.value_sum += value;
        }

        if !self.tree.expand(root, &priors) {
            self.stats.refused_expansions += 1;
            return Ok(());
        }

        if config.use_dirichlet {
            policy::add_dirichlet_noise(
                &mut self.tree,
                root,
                config.dirichlet_alpha,
                config.dirichlet_frac,
                rng,
            )?;
        }
        Ok(())
    }

    fn simulate<E>(
        &mut self,
        root: NodeId,
        position: &P,
        evaluator: &E,
        config: &MctsConfig,
        stop: &StopToken,
        start: Instant,
    ) -> Result<StopReason, SearchError>
    where
        E: Evaluator + ?Sized,
    {
        let root_node = self.tree.get(root);
        if root_node.is_terminal {
            return Ok(StopReason::TerminalRoot);
        }

        for round in 0..config.rounds() {
            if self.tree.get_usage() > config.memory_threshold || !self.tree.is_expanded(root) {
                debug!(usage = self.tree.get_usage(), round, "memory limit reached");
                return Ok(StopReason::MemoryLimit);
            }
            if stop.is_stopped() {
                return Ok(StopReason::Stopped);
            }
            if let Some(limit) = config.time_limit {
                if start.elapsed() >= limit {
                    return Ok(StopReason::TimeLimit);
                }
            }

            self.phase = SearchPhase::Simulating;
            self.run_round(root, position, evaluator, config)?;
            self.stats.rounds += 1;

            if config.verbose && info_due(round) {
                info!("{}", diagnostics::info(&self.tree, root));
            }
        }
        Ok(StopReason::Completed)
    }

    /// One round: select, evaluate, expand, backpropagate.
    fn run_round<E>(
        &mut self,
        root: NodeId,
        position: &P,
        evaluator: &E,
        config: &MctsConfig,
    ) -> Result<(), SearchError>
    where
        E: Evaluator + ?Sized,
    {
        let select_start = Instant::now();
        let slots: Vec<Slot<P>> = (0..config.batch_size)
            .map(|_| self.select_leaf(root, position, config))
            .collect();
        self.stats.selection_time_us += select_start.elapsed().as_micros() as u64;

        if let Err(e) = self.resolve_leaves(&slots, evaluator) {
            for slot in &slots {
                self.tree.remove_virtual_loss(&slot.path);
            }
            return Err(e);
        }

        let backprop_start = Instant::now();
        for slot in &slots {
            let leaf = self.tree.get(slot.leaf());
            if leaf.is_terminal {
                self.stats.terminal_hits += 1;
            }
            let value = leaf.value;
            self.tree.backpropagate(&slot.path, value);
            if let Some(forced) = slot.forced {
                self.tree.get_mut(forced).forced_visits += 1;
            }
        }
        self.stats.backprop_time_us += backprop_start.elapsed().as_micros() as u64;

        trace!(
            root_visits = self.tree.get(root).visit_count,
            nodes = self.tree.len(),
            "round complete"
        );
        Ok(())
    }

    /// Walk from the root to a leaf by PUCT, reserving every node on the path
    /// with a virtual loss.
    fn select_leaf(&mut self, root: NodeId, position: &P, config: &MctsConfig) -> Slot<P> {
        let mut path = vec![root];
        let mut leaf_position = position.clone();
        let mut forced = None;
        self.tree.get_mut(root).virtual_loss += 1;

        let mut current = root;
        while !self.tree.get(current).is_leaf() {
            let node = self.tree.get(current);
            let parent_visits = (node.visit_count + node.virtual_loss) as f32;

            let forced_pick = if config.forced_playouts {
                policy::forced_child(&self.tree, current, parent_visits, config.forced_playout_k)
            } else {
                None
            };
            let child = match forced_pick {
                Some(child) => {
                    // Only root visits feed target pruning
                    if current == root {
                        forced = Some(child);
                    }
                    child
                }
                None => self.select_child(current, parent_visits, config),
            };

            let child_node = self.tree.get_mut(child);
            child_node.virtual_loss += 1;
            if let Some(mv) = child_node.mv {
                leaf_position = leaf_position.apply(mv);
            }
            path.push(child);
            current = child;
        }

        Slot {
            path,
            position: leaf_position,
            forced,
        }
    }

    /// Child with the highest PUCT score; the first maximum in move order
    /// wins ties.
    fn select_child(&self, node: NodeId, parent_visits: f32, config: &MctsConfig) -> NodeId {
        let children = self.tree.children_of(node);
        let mut best = children[0];
        let mut best_score = f32::NEG_INFINITY;

        for &child in children {
            let score = self
                .tree
                .get(child)
                .puct_score(parent_visits, config.c_base, config.c_init);
            if score > best_score {
                best = child;
                best_score = score;
            }
        }
        best
    }

    /// Give every slot's leaf a value.
    ///
    /// Terminal leaves take the game outcome, already evaluated leaves keep
    /// their stored value, and the rest are evaluated in one batch and
    /// expanded. A leaf selected by several slots is evaluated once. All
    /// evaluator output is validated before the tree is touched.
    fn resolve_leaves<E>(&mut self, slots: &[Slot<P>], evaluator: &E) -> Result<(), SearchError>
    where
        E: Evaluator + ?Sized,
    {
        let mut pending: Vec<(NodeId, &P, Vec<P::Move>)> = Vec::new();

        for slot in slots {
            let leaf = slot.leaf();
            if self.tree.get(leaf).is_evaluated {
                continue;
            }
            if pending.iter().any(|&(id, _, _)| id == leaf) {
                self.stats.duplicate_leaves += 1;
                continue;
            }
            // Generated once here and reused for the priors
            let moves = slot.position.legal_moves();
            if let Some(value) = slot.position.terminal_value_with(&moves) {
                let node = self.tree.get_mut(leaf);
                node.is_terminal = true;
                node.is_evaluated = true;
                node.value = value;
                continue;
            }
            pending.push((leaf, &slot.position, moves));
        }

        if pending.is_empty() {
            return Ok(());
        }

        let inputs = pending
            .iter()
            .map(|&(_, pos, _)| checked_input(pos))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&[f32]> = inputs.iter().map(Vec::as_slice).collect();

        let inference_start = Instant::now();
        let results = evaluator.evaluate_batch(&refs)?;
        self.stats.inference_time_us += inference_start.elapsed().as_micros() as u64;
        self.stats.batches += 1;
        self.stats.evaluations += pending.len() as u32;

        if results.len() != pending.len() {
            return Err(SearchError::BatchSizeMismatch {
                expected: pending.len(),
                got: results.len(),
            });
        }

        let expansions = pending
            .into_iter()
            .zip(&results)
            .map(|((leaf, _, moves), result)| {
                check_result::<P>(result)?;
                Ok((leaf, result.search_value(), legal_priors::<P>(moves, &result.policy)?))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let expand_start = Instant::now();
        for (leaf, value, priors) in expansions {
            let node = self.tree.get_mut(leaf);
            node.is_evaluated = true;
            node.value = value;
            if !self.tree.expand(leaf, &priors) {
                self.stats.refused_expansions += 1;
            }
        }
        self.stats.expansion_time_us += expand_start.elapsed().as_micros() as u64;
        Ok(())
    }
}

impl<P: Position> Default for MctsSearch<P> {
    fn default() -> Self {
        Self::new(MctsTree::default())
    }
}

/// Verbose info lines follow the first round and every `INFO_INTERVAL`th.
fn info_due(round: u32) -> bool {
    round % INFO_INTERVAL == 0
}

fn checked_input<P: Position>(position: &P) -> Result<Vec<f32>, SearchError> {
    let input = position.to_input();
    if input.len() != P::input_size() {
        return Err(SearchError::InputSizeMismatch {
            expected: P::input_size(),
            got: input.len(),
        });
    }
    Ok(input)
}

fn check_result<P: Position>(result: &EvalResult) -> Result<(), SearchError> {
    if result.policy.len() != P::policy_size() {
        return Err(SearchError::PolicySizeMismatch {
            expected: P::policy_size(),
            got: result.policy.len(),
        });
    }
    if !result.value.is_finite() {
        return Err(SearchError::InvalidValue(result.value));
    }
    if let Some(&p) = result.policy.iter().find(|p| !p.is_finite()) {
        return Err(SearchError::InvalidValue(p));
    }
    Ok(())
}

/// Priors for `moves`, renormalized to sum to one.
/// Negative entries count as zero; with no legal mass the priors are uniform.
fn legal_priors<P: Position>(
    moves: Vec<P::Move>,
    policy: &[f32],
) -> Result<Vec<(P::Move, f32)>, SearchError> {
    let mut priors = moves
        .into_iter()
        .map(|mv| {
            let index = P::policy_index(mv);
            policy
                .get(index)
                .map(|&p| (mv, p.max(0.0)))
                .ok_or(SearchError::PolicyIndexOutOfRange {
                    index,
                    size: policy.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let sum: f32 = priors.iter().map(|&(_, p)| p).sum();
    if sum > 0.0 {
        for (_, p) in &mut priors {
            *p /= sum;
        }
    } else if !priors.is_empty() {
        let uniform = 1.0 / priors.len() as f32;
        for (_, p) in &mut priors {
            *p = uniform;
        }
    }
    Ok(priors)
}
