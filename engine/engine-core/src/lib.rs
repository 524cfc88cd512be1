//! Core traits and types shared by the search engine and game implementations
//!
//! This crate provides the contract the MCTS engine consumes:
//! - `Position`: copyable game position with legal-move generation, terminal
//!   and repetition detection, and the mapping onto the evaluator's policy vector
//! - `Color`: side to move in a two-player game
//! - `MateSolver`: exact forced-win search used by the self-play driver to
//!   short-circuit search

pub mod error;
pub mod mate;
pub mod position;

// Re-export main types for convenience
pub use error::PositionError;
pub use mate::{BoundedMateSolver, MateSolver};
pub use position::{Color, Position, Repetition};

/// Test fixtures (internal use only)
#[cfg(test)]
pub(crate) mod test_utils;
