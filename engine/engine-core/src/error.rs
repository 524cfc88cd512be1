//! Errors raised by position adapters.

use thiserror::Error;

/// Error type for building or updating positions from external input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("Failed to parse move '{0}'")]
    InvalidMove(String),

    #[error("Illegal move {mv} at ply {ply}")]
    IllegalMove { mv: String, ply: u32 },

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}
