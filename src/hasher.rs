//! Incremental Zobrist hashing of the board and side to move.
//!
//! The cumulative hash is the XOR of one key per stone on the board, plus the
//! side-to-move key once for every turn change. Every hash reached during the
//! game is kept so that positional superko can be checked in O(1).

use std::collections::HashSet;

use crate::board::{Position, Stone};

#[derive(Clone, Debug)]
pub struct Hasher {
    width: usize,
    /// One key per (cell, colour): index 0 for Black, 1 for White
    keys: Vec<[u64; 2]>,
    side_to_move_key: u64,
    hash: u64,
    /// Every hash reached so far, in order
    history: Vec<u64>,
    seen: HashSet<u64>,
}

impl Hasher {
    /// Hasher with keys drawn from a randomly seeded generator.
    pub fn new(height: usize, width: usize) -> Self {
        Self::from_rng(height, width, &mut fastrand::Rng::new())
    }

    /// Hasher with reproducible keys.
    pub fn with_seed(height: usize, width: usize, seed: u64) -> Self {
        Self::from_rng(height, width, &mut fastrand::Rng::with_seed(seed))
    }

    fn from_rng(height: usize, width: usize, rng: &mut fastrand::Rng) -> Self {
        let keys = (0..height * width)
            .map(|_| [rng.u64(..), rng.u64(..)])
            .collect();
        Self {
            width,
            keys,
            side_to_move_key: rng.u64(..),
            hash: 0,
            history: Vec::new(),
            seen: HashSet::new(),
        }
    }

    #[inline]
    fn key(&self, pos: Position, stone: Stone) -> u64 {
        let cell = &self.keys[pos.row * self.width + pos.col];
        match stone {
            Stone::Black => cell[0],
            Stone::White => cell[1],
            Stone::Empty => 0,
        }
    }

    /// Replace the occupant of `pos` and optionally flip the side to move.
    pub fn update_hash(&mut self, pos: Position, old: Stone, new: Stone, flip_side_to_move: bool) {
        self.hash ^= self.key(pos, old);
        self.hash ^= self.key(pos, new);
        if flip_side_to_move {
            self.flip_side_to_move();
        }
    }

    pub fn flip_side_to_move(&mut self) {
        self.hash ^= self.side_to_move_key;
    }

    /// Hash that placing `placed` at `placed_pos` and removing `captured`
    /// would produce, including the turn change. Does not mutate.
    pub fn compute_resulting_hash(
        &self,
        captured: &[(Position, Stone)],
        placed_pos: Position,
        placed: Stone,
    ) -> u64 {
        let removed = captured
            .iter()
            .fold(0, |acc, &(pos, stone)| acc ^ self.key(pos, stone));
        self.hash ^ removed ^ self.key(placed_pos, placed) ^ self.side_to_move_key
    }

    /// Record the current hash in the history.
    pub fn update_hash_history(&mut self) {
        self.history.push(self.hash);
        self.seen.insert(self.hash);
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn history(&self) -> &[u64] {
        &self.history
    }

    /// Whether `hash` was already reached in this game.
    pub fn seen(&self, hash: u64) -> bool {
        self.seen.contains(&hash)
    }
}
