//! Game state: rules, legal action generation, scoring.
//!
//! A [`GameState`] bundles the [`Board`], the [`Hasher`] and the cached list
//! of legal actions. The list is always laid out as `[Resign, Pass,
//! PlaceStone...]`, with placements in row-major order.
//!
//! Legality follows positional superko: a placement is illegal if the board
//! it produces (with the opponent to move) was already reached in this game.
//! Suicide is illegal unless the placement captures.

use std::collections::BTreeMap;
use std::fmt;

use crate::action::Action;
use crate::board::{Board, Passes, Position, Stone};
use crate::hasher::Hasher;

/// Liberty bookkeeping around an empty cell, as seen by the player to move.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NeighborLiberties {
    /// Liberties a stone placed here would start with: empty neighbours plus
    /// friendly neighbours (the latter are cancelled on merge).
    pub liberties: i32,
    /// Friendly group root -> number of adjacent cells belonging to it.
    pub friendly: BTreeMap<Position, i32>,
    /// Enemy group root -> number of adjacent cells belonging to it.
    pub enemy: BTreeMap<Position, i32>,
}

/// Area score of both players.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub black: f64,
    pub white: f64,
}

#[derive(Clone, Debug)]
pub struct GameState {
    board: Board,
    hasher: Hasher,
    legal_actions: Vec<Action>,
    komi: f64,
}

impl GameState {
    pub fn new(height: usize, width: usize, komi: f64) -> Self {
        Self::with_hasher(Board::new(height, width), Hasher::new(height, width), komi)
    }

    /// Game whose position hashes are reproducible.
    pub fn with_seed(height: usize, width: usize, komi: f64, seed: u64) -> Self {
        Self::with_hasher(
            Board::new(height, width),
            Hasher::with_seed(height, width, seed),
            komi,
        )
    }

    fn with_hasher(board: Board, hasher: Hasher, komi: f64) -> Self {
        let mut game = Self {
            board,
            hasher,
            legal_actions: Vec::new(),
            komi,
        };
        game.hasher.update_hash_history();
        game.compute_legal_actions();
        game
    }

    /// Fully independent copy, including hasher and grouping structure.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Stone {
        self.board.current_player
    }

    pub fn passes(&self) -> Passes {
        self.board.passes
    }

    pub fn komi(&self) -> f64 {
        self.komi
    }

    pub fn legal_actions(&self) -> &[Action] {
        &self.legal_actions
    }

    pub fn is_legal(&self, action: &Action) -> bool {
        self.legal_actions.contains(action)
    }

    pub fn hash(&self) -> u64 {
        self.hasher.hash()
    }

    pub fn hash_history(&self) -> &[u64] {
        self.hasher.history()
    }

    /// Tracked liberty count of the group holding `pos`, if occupied.
    pub fn group_liberties(&self, pos: Position) -> Option<i32> {
        let groups = &self.board.groups;
        groups
            .root_of(pos)
            .and_then(|root| groups.group(root))
            .map(|g| g.liberties)
    }

    /// Two consecutive passes or a resignation end the game.
    pub fn is_terminal(&self) -> bool {
        self.board.passes.both() || self.board.resigned != Stone::Empty
    }

    pub fn get_neighboring_liberties(&mut self, pos: Position) -> NeighborLiberties {
        let mut out = NeighborLiberties::default();
        let player = self.board.current_player;
        for n in self.board.neighbors(pos) {
            let stone = self.board.get(n);
            if stone == Stone::Empty {
                out.liberties += 1;
                continue;
            }
            let root = self.board.groups.find(n);
            if stone == player {
                *out.friendly.entry(root).or_insert(0) += 1;
                out.liberties += 1;
            } else {
                *out.enemy.entry(root).or_insert(0) += 1;
            }
        }
        out
    }

    /// Whether the player to move may place a stone at `pos`.
    pub fn is_legal_action(&mut self, pos: Position) -> bool {
        if self.board.get(pos) != Stone::Empty {
            return false;
        }
        let player = self.board.current_player;
        let libs = self.get_neighboring_liberties(pos);

        // A capturing move is legal unless it repeats a position.
        let mut captured = Vec::new();
        for (&root, &shared) in &libs.enemy {
            if self.board.groups.liberties(root) - shared == 0 {
                let enemy = self.board.get(root);
                captured.extend(
                    self.board
                        .collect_group(root)
                        .into_iter()
                        .map(|p| (p, enemy)),
                );
            }
        }
        if !captured.is_empty() {
            let resulting = self.hasher.compute_resulting_hash(&captured, pos, player);
            return !self.hasher.seen(resulting);
        }

        // Suicide check
        let mut total = libs.liberties;
        for (&root, &shared) in &libs.friendly {
            total += self.board.groups.liberties(root) - 2 * shared;
        }
        if total == 0 {
            return false;
        }

        let resulting = self.hasher.compute_resulting_hash(&[], pos, player);
        !self.hasher.seen(resulting)
    }

    /// Rebuild the legal action list for the player to move.
    pub fn compute_legal_actions(&mut self) {
        let mut actions = Vec::with_capacity(self.board.height() * self.board.width() + 2);
        actions.push(Action::Resign);
        actions.push(Action::Pass);
        for pos in self.board.positions() {
            if self.is_legal_action(pos) {
                actions.push(Action::PlaceStone(pos));
            }
        }
        self.legal_actions = actions;
    }

    /// Remove the group rooted at `root` from the board.
    ///
    /// Every adjacent group of the player to move gains one liberty per
    /// adjacency to an emptied cell.
    pub fn capture_group(&mut self, root: Position) -> usize {
        let player = self.board.current_player;
        let stones = self.board.collect_group(root);
        for &pos in &stones {
            let stone = self.board.get(pos);
            self.board.set(pos, Stone::Empty);
            self.hasher.update_hash(pos, stone, Stone::Empty, false);
            self.board.groups.remove_stone(pos);

            for n in self.board.neighbors(pos) {
                if self.board.get(n) == player {
                    let friend = self.board.groups.find(n);
                    self.board.groups.add_liberties(friend, 1);
                }
            }
        }
        self.board.groups.remove_group(root);
        stones.len()
    }

    /// Place a stone for the player to move, merging and capturing.
    /// Returns the number of captured stones.
    pub fn put_stone(&mut self, pos: Position) -> usize {
        let player = self.board.current_player;
        let libs = self.get_neighboring_liberties(pos);

        self.board.set(pos, player);
        self.hasher.update_hash(pos, Stone::Empty, player, false);
        self.board.groups.add_stone(pos, libs.liberties);

        let mut root = pos;
        for (&friend, &shared) in &libs.friendly {
            root = self.board.groups.union(friend, root, shared);
        }

        let mut captured = 0;
        for (&enemy, &shared) in &libs.enemy {
            if self.board.groups.liberties(enemy) - shared == 0 {
                captured += self.capture_group(enemy);
            } else {
                self.board.groups.add_liberties(enemy, -shared);
            }
        }
        captured
    }

    /// Apply one action for the player to move.
    ///
    /// `action` must come from [`GameState::legal_actions`].
    pub fn play_action(&mut self, action: Action) {
        debug_assert!(
            self.is_legal(&action),
            "play_action: {action} is not legal here"
        );
        let player = self.board.current_player;
        match action {
            Action::PlaceStone(pos) => {
                self.put_stone(pos);
                self.board.passes = Passes::default();
            }
            Action::Pass => self.board.passes.set(player),
            Action::Resign => self.board.resigned = player,
        }

        self.board.current_player = player.opponent();
        self.hasher.flip_side_to_move();
        self.hasher.update_hash_history();
        self.compute_legal_actions();
    }

    /// Area score: stones plus surrounded territory, neutral regions split
    /// evenly, komi to White.
    pub fn compute_score(&self) -> Score {
        let board = &self.board;
        let mut score = Score {
            black: 0.0,
            white: self.komi,
        };
        let mut visited = vec![false; board.height() * board.width()];
        let idx = |p: Position| p.row * board.width() + p.col;

        for pos in board.positions() {
            match board.get(pos) {
                Stone::Black => score.black += 1.0,
                Stone::White => score.white += 1.0,
                Stone::Empty if !visited[idx(pos)] => {
                    let mut size = 0usize;
                    let (mut touches_black, mut touches_white) = (false, false);
                    let mut stack = vec![pos];
                    visited[idx(pos)] = true;
                    while let Some(pt) = stack.pop() {
                        size += 1;
                        for n in board.neighbors(pt) {
                            match board.get(n) {
                                Stone::Black => touches_black = true,
                                Stone::White => touches_white = true,
                                Stone::Empty if !visited[idx(n)] => {
                                    visited[idx(n)] = true;
                                    stack.push(n);
                                }
                                Stone::Empty => {}
                            }
                        }
                    }
                    let size = size as f64;
                    match (touches_black, touches_white) {
                        (true, false) => score.black += size,
                        (false, true) => score.white += size,
                        _ => {
                            score.black += size / 2.0;
                            score.white += size / 2.0;
                        }
                    }
                }
                Stone::Empty => {}
            }
        }
        score
    }

    /// Winner by resignation or score; `Empty` for a draw.
    pub fn get_winner(&self) -> Stone {
        if self.board.resigned != Stone::Empty {
            return self.board.resigned.opponent();
        }
        let score = self.compute_score();
        if score.black > score.white {
            Stone::Black
        } else if score.white > score.black {
            Stone::White
        } else {
            Stone::Empty
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}
