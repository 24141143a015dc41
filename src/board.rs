//! Grid of stones plus the per-game flags that travel with it.
//!
//! The board owns the [`UnionFind`] grouping structure but does not enforce
//! any rule itself; legality and capture live in [`crate::game`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::union_find::UnionFind;

/// Contents of a cell, and also the identity of a player.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stone {
    #[default]
    Empty,
    Black,
    White,
}

impl Stone {
    /// The other player.
    ///
    /// # Panics
    /// On `Stone::Empty`, which has no opponent.
    pub fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
            Stone::Empty => panic!("Stone::opponent: an empty cell has no opponent"),
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Stone::Empty => '.',
            Stone::Black => 'X',
            Stone::White => 'O',
        }
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stone::Empty => "Empty",
            Stone::Black => "Black",
            Stone::White => "White",
        };
        f.write_str(name)
    }
}

/// A cell on the board, row 0 at the top.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Whether each player passed since the last placement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Passes {
    pub black: bool,
    pub white: bool,
}

impl Passes {
    pub fn set(&mut self, player: Stone) {
        match player {
            Stone::Black => self.black = true,
            Stone::White => self.white = true,
            Stone::Empty => {}
        }
    }

    pub fn has_passed(&self, player: Stone) -> bool {
        match player {
            Stone::Black => self.black,
            Stone::White => self.white,
            Stone::Empty => false,
        }
    }

    pub fn both(&self) -> bool {
        self.black && self.white
    }
}

const DIRECTIONS: [(isize, isize); 4] = [
    (-1, 0), // Up
    (1, 0),  // Down
    (0, -1), // Left
    (0, 1),  // Right
];

/// The playing grid.
#[derive(Clone, Debug)]
pub struct Board {
    height: usize,
    width: usize,
    cells: Vec<Stone>,
    /// Player to move
    pub current_player: Stone,
    pub passes: Passes,
    /// Player who resigned, `Empty` if nobody did
    pub resigned: Stone,
    pub(crate) groups: UnionFind,
}

impl Board {
    pub fn new(height: usize, width: usize) -> Self {
        assert!(height > 0 && width > 0, "Board::new: empty board {height}x{width}");
        Self {
            height,
            width,
            cells: vec![Stone::Empty; height * width],
            current_player: Stone::Black,
            passes: Passes::default(),
            resigned: Stone::Empty,
            groups: UnionFind::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn idx(&self, pos: Position) -> usize {
        pos.row * self.width + pos.col
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Stone {
        self.cells[self.idx(pos)]
    }

    #[inline]
    pub(crate) fn set(&mut self, pos: Position, stone: Stone) {
        let i = self.idx(pos);
        self.cells[i] = stone;
    }

    /// All cells in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let width = self.width;
        (0..self.height * self.width).map(move |i| Position::new(i / width, i % width))
    }

    /// Orthogonal neighbours of `pos` that lie on the board.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + use<> {
        let (height, width) = (self.height, self.width);
        DIRECTIONS.into_iter().filter_map(move |(dr, dc)| {
            let row = pos.row.checked_add_signed(dr)?;
            let col = pos.col.checked_add_signed(dc)?;
            (row < height && col < width).then_some(Position::new(row, col))
        })
    }

    /// Collect every stone connected to `start` through same-coloured cells.
    pub fn collect_group(&self, start: Position) -> Vec<Position> {
        let color = self.get(start);
        let mut stack = vec![start];
        let mut visited = vec![false; self.cells.len()];
        let mut out = Vec::new();

        while let Some(pt) = stack.pop() {
            let i = self.idx(pt);
            if visited[i] {
                continue;
            }
            visited[i] = true;
            out.push(pt);
            for n in self.neighbors(pt) {
                if !visited[self.idx(n)] && self.get(n) == color {
                    stack.push(n);
                }
            }
        }
        out
    }

    /// Number of non-empty cells.
    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|&&s| s != Stone::Empty).count()
    }

    /// Whether star-point metadata exists for this board size.
    pub fn has_star_points(&self) -> bool {
        self.height == self.width && matches!(self.height, 9 | 13 | 19)
    }

    /// The highlighted intersections drawn on a traditional board.
    ///
    /// # Panics
    /// For board sizes other than 9x9, 13x13 and 19x19.
    pub fn star_points(&self) -> Vec<Position> {
        let lines: &[usize] = match (self.height, self.width) {
            (9, 9) => &[2, 4, 6],
            (13, 13) => &[3, 6, 9],
            (19, 19) => &[3, 9, 15],
            (h, w) => panic!("Board::star_points: unsupported board size {h}x{w}"),
        };
        lines
            .iter()
            .flat_map(|&row| lines.iter().map(move |&col| Position::new(row, col)))
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stars = if self.has_star_points() {
            self.star_points()
        } else {
            Vec::new()
        };
        for row in 0..self.height {
            for col in 0..self.width {
                let pos = Position::new(row, col);
                let ch = match self.get(pos) {
                    Stone::Empty if stars.contains(&pos) => '+',
                    stone => stone.glyph(),
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Current player: {}", self.current_player)
    }
}
