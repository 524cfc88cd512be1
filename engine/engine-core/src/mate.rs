//! Exact forced-win search.
//!
//! The self-play driver asks a `MateSolver` before every search. When it
//! proves a forced win within a few plies the move is played directly and the
//! tree search is skipped.

use tracing::trace;

use crate::position::Position;

/// Solver that proves forced wins for the side to move.
pub trait MateSolver<P: Position>: Send + Sync {
    /// First move of a forced win for the side to move, if one exists within
    /// the solver's bound.
    fn solve(&self, position: &P) -> Option<P::Move>;
}

/// Depth-first AND/OR search bounded by a number of plies.
///
/// Attacker nodes need one winning move, defender nodes need every reply to
/// lose. The bound counts both sides' moves, so only odd bounds are useful.
#[derive(Debug, Clone, Copy)]
pub struct BoundedMateSolver {
    pub max_plies: u32,
}

impl Default for BoundedMateSolver {
    fn default() -> Self {
        Self { max_plies: 7 }
    }
}

impl BoundedMateSolver {
    pub fn new(max_plies: u32) -> Self {
        Self { max_plies }
    }

    fn attack<P: Position>(&self, position: &P, plies: u32) -> Option<P::Move> {
        if plies == 0 || position.is_terminal() {
            return None;
        }

        position
            .legal_moves()
            .into_iter()
            .find(|&mv| self.defender_loses(&position.apply(mv), plies - 1))
    }

    fn defender_loses<P: Position>(&self, position: &P, plies: u32) -> bool {
        if let Some(value) = position.terminal_value() {
            return value < 0.5;
        }

        // One defender move plus one attacker move at least.
        if plies < 2 {
            return false;
        }

        position
            .legal_moves()
            .into_iter()
            .all(|reply| self.attack(&position.apply(reply), plies - 1).is_some())
    }
}

impl<P: Position> MateSolver<P> for BoundedMateSolver {
    fn solve(&self, position: &P) -> Option<P::Move> {
        let found = self.attack(position, self.max_plies);
        if let Some(mv) = found {
            trace!(ply = position.ply(), mv = %mv, "forced win found");
        }
        found
    }
}
