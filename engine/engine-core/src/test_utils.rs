//! Shared fixtures for the crate's unit tests.

use crate::position::{Color, Position, Repetition};

/// Nim-like counter: each move removes 1 or 2, the side facing 0 has lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub remaining: u8,
    pub ply: u32,
    pub last: Option<u8>,
    pub repetition: Repetition,
}

impl Counter {
    pub fn new(remaining: u8) -> Self {
        Self {
            remaining,
            ply: 0,
            last: None,
            repetition: Repetition::NONE,
        }
    }
}

impl Position for Counter {
    type Move = u8;

    fn legal_moves(&self) -> Vec<u8> {
        (1..=2).filter(|&n| n <= self.remaining).collect()
    }

    fn apply(&self, mv: u8) -> Self {
        Self {
            remaining: self.remaining - mv,
            ply: self.ply + 1,
            last: Some(mv),
            repetition: Repetition::NONE,
        }
    }

    fn repetition(&self) -> Repetition {
        self.repetition
    }

    fn side_to_move(&self) -> Color {
        if self.ply % 2 == 0 {
            Color::First
        } else {
            Color::Second
        }
    }

    fn ply(&self) -> u32 {
        self.ply
    }

    fn last_move(&self) -> Option<u8> {
        self.last
    }

    fn to_input(&self) -> Vec<f32> {
        vec![self.remaining as f32]
    }

    fn input_size() -> usize {
        1
    }

    fn policy_index(mv: u8) -> usize {
        mv as usize - 1
    }

    fn policy_size() -> usize {
        2
    }
}
