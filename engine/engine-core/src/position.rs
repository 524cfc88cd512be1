//! Position trait consumed by the search engine
//!
//! The search never looks inside a game. Everything it needs from the rules
//! engine goes through this trait: copying, applying moves, generating legal
//! moves, detecting terminal and repetition outcomes, and mapping moves onto
//! the evaluator's policy vector.

use std::fmt::{Debug, Display};

/// Side to move in a two-player game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Player who moves at ply 0 (Black / sente in shogi)
    First,
    /// Player who moves at ply 1 (White / gote in shogi)
    Second,
}

impl Color {
    /// The other player.
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::First => Color::Second,
            Color::Second => Color::First,
        }
    }

    /// Index used in game records: 0 for the first player, 1 for the second.
    #[inline]
    pub fn index(self) -> u8 {
        match self {
            Color::First => 0,
            Color::Second => 1,
        }
    }
}

/// Repetition outcome of a position.
///
/// A plain repetition ends the game under the game's repetition rule. The two
/// loss flags model perpetual-check style rules where the repeating side loses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repetition {
    /// The position has repeated often enough to end the game
    pub is_repetition: bool,
    /// The side to move caused the repetition illegally and loses
    pub mover_loses: bool,
    /// The opponent caused the repetition illegally and loses
    pub opponent_loses: bool,
}

impl Repetition {
    /// No repetition.
    pub const NONE: Repetition = Repetition {
        is_repetition: false,
        mover_loses: false,
        opponent_loses: false,
    };
}

/// Game position as seen by the search.
///
/// Implementations must have value semantics: `apply` returns a new position
/// and never mutates `self`, so the search can clone the root and replay a
/// path without disturbing the caller's position.
///
/// All values are win probabilities in `[0, 1]` from the perspective of the
/// side to move.
pub trait Position: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Move type. `Display` produces the identifier written to training
    /// records (sfen notation for shogi variants).
    type Move: Copy + Eq + Debug + Display + Send + Sync + 'static;

    /// Legal moves in generation order. The order is significant: the search
    /// breaks ties by taking the first maximum, so it must be deterministic.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// Position after playing `mv`.
    fn apply(&self, mv: Self::Move) -> Self;

    /// Repetition status of this position.
    fn repetition(&self) -> Repetition {
        Repetition::NONE
    }

    /// Side to move.
    fn side_to_move(&self) -> Color;

    /// Number of moves played from the start position.
    fn ply(&self) -> u32;

    /// Move that led to this position, if any.
    fn last_move(&self) -> Option<Self::Move>;

    /// Evaluator input features for this position.
    fn to_input(&self) -> Vec<f32>;

    /// Length of the vector returned by `to_input`.
    fn input_size() -> usize;

    /// Index of `mv` in the evaluator's policy vector.
    fn policy_index(mv: Self::Move) -> usize;

    /// Length of the evaluator's policy vector.
    fn policy_size() -> usize;

    /// Value for the side to move when it has no legal moves.
    ///
    /// Defaults to a loss (checkmate). Games where running out of moves can
    /// favour the mover (for example a mate delivered by an illegal pawn drop)
    /// or is a draw override this.
    fn no_moves_value(&self) -> f32 {
        0.0
    }

    /// Value for the side to move under a plain repetition.
    fn repetition_value(&self) -> f32 {
        0.5
    }

    /// Game-determined value if the position is terminal, `None` otherwise.
    ///
    /// Repetition losses take priority over plain repetition, which takes
    /// priority over running out of legal moves.
    fn terminal_value(&self) -> Option<f32> {
        self.repetition_outcome()
            .or_else(|| self.legal_moves().is_empty().then(|| self.no_moves_value()))
    }

    /// `terminal_value` for callers that already generated `legal_moves`.
    fn terminal_value_with(&self, legal_moves: &[Self::Move]) -> Option<f32> {
        self.repetition_outcome()
            .or_else(|| legal_moves.is_empty().then(|| self.no_moves_value()))
    }

    /// Value decided by repetition alone, if any.
    fn repetition_outcome(&self) -> Option<f32> {
        let repetition = self.repetition();
        if repetition.mover_loses {
            Some(0.0)
        } else if repetition.opponent_loses {
            Some(1.0)
        } else if repetition.is_repetition {
            Some(self.repetition_value())
        } else {
            None
        }
    }

    /// Convenience check for `terminal_value().is_some()`.
    fn is_terminal(&self) -> bool {
        self.terminal_value().is_some()
    }
}
