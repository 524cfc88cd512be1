//! Evaluator trait for position evaluation.
//!
//! The evaluator provides policy (move probabilities) and value estimates
//! for positions. In AlphaZero this is a neural network; it lives outside
//! this crate and plugs in through [`Evaluator`]. A uniform evaluator is
//! provided for testing and benchmarks.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model error: {0}")]
    ModelError(String),
}

/// Result of evaluating one position.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    /// Raw policy over the full policy vector, indexed by
    /// `Position::policy_index`. Mass on illegal moves is ignored by the
    /// search, which renormalizes over legal moves.
    pub policy: Vec<f32>,

    /// Value estimate for the side to move.
    /// Range: -1.0 (certain loss) to +1.0 (certain win).
    pub value: f32,
}

impl EvalResult {
    /// Value remapped to the search's `[0, 1]` win-probability scale.
    #[inline]
    pub fn search_value(&self) -> f32 {
        (self.value + 1.0) / 2.0
    }
}

/// Trait for position evaluators.
///
/// Evaluators are shared read-only by every search that uses them, possibly
/// from several threads at once. Any internal synchronization (a locked
/// inference session, for example) is the implementation's concern.
pub trait Evaluator: Send + Sync {
    /// Evaluate a single position's input features.
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError>;

    /// Batch evaluate several positions. Must return one result per input,
    /// in order. Default implementation calls `evaluate` in a loop.
    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        inputs.iter().map(|input| self.evaluate(input)).collect()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        (**self).evaluate(input)
    }

    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        (**self).evaluate_batch(inputs)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        (**self).evaluate(input)
    }

    fn evaluate_batch(&self, inputs: &[&[f32]]) -> Result<Vec<EvalResult>, EvaluatorError> {
        (**self).evaluate_batch(inputs)
    }
}

/// Uniform evaluator that assigns equal probability to every policy entry.
/// Value is always 0.0 (neutral). Useful for testing MCTS without a model.
#[derive(Debug, Clone)]
pub struct UniformEvaluator {
    policy_size: usize,
}

impl UniformEvaluator {
    pub fn new(policy_size: usize) -> Self {
        Self { policy_size }
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, _input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let prob = if self.policy_size == 0 {
            0.0
        } else {
            1.0 / self.policy_size as f32
        };
        Ok(EvalResult {
            policy: vec![prob; self.policy_size],
            value: 0.0,
        })
    }
}
