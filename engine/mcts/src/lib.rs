//! Batched Monte Carlo Tree Search for AlphaZero-style self-play.
//!
//! The search works with any game implementing the `engine-core` [`Position`]
//! trait and any policy/value model implementing [`Evaluator`].
//!
//! # Overview
//!
//! A search episode runs `simulation_num / batch_size` rounds. Each round:
//!
//! 1. **Selection**: `batch_size` root-to-leaf walks by PUCT. Every node on a
//!    walk takes a virtual loss so later walks in the same round spread out
//! 2. **Evaluation**: all new leaves go to the evaluator in one batch;
//!    terminal leaves use the game outcome instead
//! 3. **Expansion**: each evaluated leaf gets one child per legal move, with
//!    priors renormalized over the legal moves
//! 4. **Backpropagation**: the leaf value flows back up the walk, flipping
//!    perspective at every ply, and the virtual losses are removed
//!
//! Values are win probabilities in `[0, 1]` for the side to move; the
//! evaluator's raw `[-1, 1]` value is remapped on arrival.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{best_move, MctsConfig, MctsSearch, StopToken, UniformEvaluator};
//! use games_tictactoe::TicTacToe;
//! use engine_core::Position;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let position = TicTacToe::new();
//! let evaluator = UniformEvaluator::new(TicTacToe::policy_size());
//! let config = MctsConfig::for_testing();
//!
//! let mut search = MctsSearch::with_capacity(1 << 16);
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let root = search.run(&position, &evaluator, &config, &mut rng, &StopToken::new())?;
//!
//! println!("Best move: {:?}", search.best_move(root));
//! println!("{}", search.info(root));
//! ```
//!
//! # Configuration
//!
//! [`MctsConfig`] controls the search:
//!
//! - `simulation_num` / `batch_size`: total simulations and leaves per round
//! - `use_dirichlet`, `dirichlet_alpha`, `dirichlet_frac`: root noise
//! - `forced_playouts`, `target_pruning`: KataGo-style forced playouts and
//!   their removal from training targets
//! - `reuse_tree`, `immediate`: keep the played subtree between moves and
//!   skip searching when it already holds enough playouts
//! - `memory_threshold`, `time_limit`: early stops checked between rounds
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MctsSearch                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  MctsTree   │  │  Position   │  │     Evaluator       │  │
//! │  │  (arena)    │  │  (rules)    │  │  (policy/value)     │  │
//! │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//! │         │                │                    │             │
//! │         ▼                ▼                    ▼             │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │   select × batch → evaluate batch → expand →         │   │
//! │  │                     backpropagate                    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Position`]: engine_core::Position

pub mod config;
pub mod diagnostics;
pub mod evaluator;
pub mod node;
pub mod policy;
pub mod ponder;
pub mod search;
pub mod stop;
pub mod tree;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-export main types
pub use config::MctsConfig;
pub use diagnostics::{
    child_stats, dump, info, principal_variation, summary, visualize, ChildStats, Dump,
    SearchInfo,
};
pub use evaluator::{EvalResult, Evaluator, EvaluatorError, UniformEvaluator};
pub use node::{MctsNode, NodeId};
pub use policy::{best_move, dirichlet_noise, softmax_sample, MoveChoice};
pub use ponder::Ponder;
pub use search::{MctsSearch, SearchError, SearchPhase, SearchStats, StopReason};
pub use stop::StopToken;
pub use tree::{MctsTree, TreeStats};
