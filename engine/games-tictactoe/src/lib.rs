//! TicTacToe implementation of the engine-core `Position` trait
//!
//! Small enough to search exhaustively, which makes it the reference game for
//! the search engine's tests and benchmarks and the default game of the
//! self-play actor.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::Position;
//! use games_tictactoe::{Cell, TicTacToe};
//!
//! let pos = TicTacToe::new().apply(Cell(4));
//! assert_eq!(pos.legal_moves().len(), 8);
//! ```

use std::fmt;

use engine_core::{Color, Position, PositionError};

/// Winning lines (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// Number of evaluator input features: two one-hot planes, a legal mask and
/// the side to move.
pub const INPUT_SIZE: usize = 18 + 9 + 2;

/// A move: place the side to move's mark on a cell (0-8, row-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell(pub u8);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TicTacToe position
///
/// The side to move always switches, including on the move that ends the
/// game, so a finished game is seen from the loser's side (or either side on
/// a draw).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicTacToe {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; 9],
    /// Current player: 1=X, 2=O
    current_player: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
    ply: u32,
    last_move: Option<Cell>,
}

impl TicTacToe {
    /// Create the empty board with X to move
    pub fn new() -> Self {
        Self {
            board: [0; 9],
            current_player: 1, // X goes first
            winner: 0,
            ply: 0,
            last_move: None,
        }
    }

    /// Play a sequence of cells from the empty board.
    pub fn from_moves(cells: &[u8]) -> Result<Self, PositionError> {
        cells.iter().try_fold(Self::new(), |pos, &cell| pos.play(cell))
    }

    /// Checked version of `apply`.
    pub fn play(&self, cell: u8) -> Result<Self, PositionError> {
        if cell >= 9 {
            return Err(PositionError::InvalidMove(format!(
                "cell {cell} is off the board"
            )));
        }
        if self.is_done() || self.board[cell as usize] != 0 {
            return Err(PositionError::IllegalMove {
                mv: cell.to_string(),
                ply: self.ply,
            });
        }
        Ok(self.apply(Cell(cell)))
    }

    /// Board cells: 0=empty, 1=X, 2=O
    pub fn board(&self) -> &[u8; 9] {
        &self.board
    }

    /// Winner: 0=ongoing, 1=X, 2=O, 3=draw
    pub fn winner(&self) -> u8 {
        self.winner
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.winner != 0
    }

    /// Bit-mask representation of legal moves.
    ///
    /// Bits 0-8 correspond to board cells 0-8. When the game is finished the
    /// mask is zeroed.
    pub fn legal_moves_mask(&self) -> u16 {
        if self.is_done() {
            return 0;
        }

        self.board
            .iter()
            .enumerate()
            .fold(0u16, |mask, (idx, cell)| {
                if *cell == 0 {
                    mask | (1u16 << idx)
                } else {
                    mask
                }
            })
    }

    /// Check for winner on the board
    fn check_winner(board: &[u8; 9]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a];
            }
        }

        // Board full but no winner
        if board.iter().all(|&cell| cell != 0) {
            return 3;
        }

        0
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl Position for TicTacToe {
    type Move = Cell;

    fn legal_moves(&self) -> Vec<Cell> {
        if self.is_done() {
            return Vec::new();
        }

        (0..9u8)
            .filter(|&pos| self.board[pos as usize] == 0)
            .map(Cell)
            .collect()
    }

    fn apply(&self, mv: Cell) -> Self {
        let mut next = *self;
        next.board[mv.0 as usize] = self.current_player;
        next.winner = Self::check_winner(&next.board);
        next.current_player = if self.current_player == 1 { 2 } else { 1 };
        next.ply = self.ply + 1;
        next.last_move = Some(mv);
        next
    }

    fn side_to_move(&self) -> Color {
        if self.current_player == 1 {
            Color::First
        } else {
            Color::Second
        }
    }

    fn ply(&self) -> u32 {
        self.ply
    }

    fn last_move(&self) -> Option<Cell> {
        self.last_move
    }

    /// One-hot encoding of [X cells, O cells], legal mask, side to move.
    fn to_input(&self) -> Vec<f32> {
        let mut input = vec![0.0; INPUT_SIZE];

        for (i, &cell) in self.board.iter().enumerate() {
            if cell == 1 {
                input[i] = 1.0;
            } else if cell == 2 {
                input[i + 9] = 1.0;
            }
        }

        let mask = self.legal_moves_mask();
        for pos in 0..9 {
            if (mask & (1u16 << pos)) != 0 {
                input[18 + pos] = 1.0;
            }
        }

        if self.current_player == 1 {
            input[27] = 1.0;
        } else {
            input[28] = 1.0;
        }

        input
    }

    fn input_size() -> usize {
        INPUT_SIZE
    }

    fn policy_index(mv: Cell) -> usize {
        mv.0 as usize
    }

    fn policy_size() -> usize {
        9
    }

    /// A completed line means the previous mover won; a full board is a draw.
    fn no_moves_value(&self) -> f32 {
        if self.winner == 3 {
            0.5
        } else {
            0.0
        }
    }
}
