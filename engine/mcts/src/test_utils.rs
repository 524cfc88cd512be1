//! Fixtures shared by the search tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use engine_core::{Color, Position};

use crate::evaluator::{EvalResult, Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::tree::MctsTree;

/// Largest branching factor `Branching` supports.
pub const MAX_BRANCHING: u8 = 8;

/// Uniform game tree: every position has `branching` moves until `depth`
/// plies have been played, after which the side to move has no moves and
/// takes `no_moves` as its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Branching {
    pub branching: u8,
    pub depth: u32,
    pub path: Vec<u8>,
    pub no_moves: f32,
}

impl Branching {
    pub fn new(branching: u8, depth: u32) -> Self {
        assert!(branching <= MAX_BRANCHING);
        Self {
            branching,
            depth,
            path: Vec::new(),
            no_moves: 0.0,
        }
    }
}

impl Position for Branching {
    type Move = u8;

    fn legal_moves(&self) -> Vec<u8> {
        if self.path.len() as u32 >= self.depth {
            return Vec::new();
        }
        (0..self.branching).collect()
    }

    fn apply(&self, mv: u8) -> Self {
        let mut next = self.clone();
        next.path.push(mv);
        next
    }

    fn side_to_move(&self) -> Color {
        if self.path.len() % 2 == 0 {
            Color::First
        } else {
            Color::Second
        }
    }

    fn ply(&self) -> u32 {
        self.path.len() as u32
    }

    fn last_move(&self) -> Option<u8> {
        self.path.last().copied()
    }

    fn to_input(&self) -> Vec<f32> {
        vec![
            self.path.len() as f32,
            self.path.last().map_or(-1.0, |&m| m as f32),
        ]
    }

    fn input_size() -> usize {
        2
    }

    fn policy_index(mv: u8) -> usize {
        mv as usize
    }

    fn policy_size() -> usize {
        MAX_BRANCHING as usize
    }

    fn no_moves_value(&self) -> f32 {
        self.no_moves
    }
}

/// Tree over `Branching::new(branching, 4)` with the root expanded under
/// uniform priors.
pub fn expanded_root(branching: u8) -> (MctsTree<Branching>, NodeId) {
    let pos = Branching::new(branching, 4);
    let mut tree = MctsTree::with_capacity(100);
    let root = tree.set_root(&pos, false);
    let p = 1.0 / branching as f32;
    let priors: Vec<(u8, f32)> = pos.legal_moves().into_iter().map(|mv| (mv, p)).collect();
    assert!(tree.expand(root, &priors));
    (tree, root)
}

/// Evaluator returning a fixed policy and value, recording every call.
#[derive(Debug)]
pub struct MockEvaluator {
    pub policy: Vec<f32>,
    pub value: f32,
    /// Fail on this call (0-based) and every later one
    pub fail_from: Option<usize>,
    /// Return one result fewer than requested
    pub short_batch: bool,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockEvaluator {
    pub fn new(policy: Vec<f32>, value: f32) -> Self {
        Self {
            policy,
            value,
            fail_from: None,
            short_batch: false,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Uniform over `Branching`'s policy vector.
    pub fn uniform(value: f32) -> Self {
        let n = MAX_BRANCHING as usize;
        Self::new(vec![1.0 / n as f32; n], value)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    /// Total positions evaluated.
    pub fn evaluations(&self) -> usize {
        self.batch_sizes().iter().sum()
    }
}

impl Evaluator for MockEvaluator {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let mut results = self.evaluate_batch(&[input])?;
        results
            .pop()
            .ok_or_else(|| EvaluatorError::EvaluationFailed("empty batch".into()))
    }

    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.map_or(false, |n| call >= n) {
            return Err(EvaluatorError::ModelError("scripted failure".into()));
        }
        self.batch_sizes.lock().unwrap().push(inputs.len());

        let count = if self.short_batch {
            inputs.len().saturating_sub(1)
        } else {
            inputs.len()
        };
        Ok((0..count)
            .map(|_| EvalResult {
                policy: self.policy.clone(),
                value: self.value,
            })
            .collect())
    }
}
