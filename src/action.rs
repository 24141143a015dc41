//! The three kinds of move a player can make.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Position;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    PlaceStone(Position),
    Pass,
    Resign,
}

impl Action {
    pub fn place(row: usize, col: usize) -> Self {
        Action::PlaceStone(Position::new(row, col))
    }
}

/// `PlaceStone(C,4)` names column C, row 4 (1-based).
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PlaceStone(pos) => {
                let col = char::from_u32('A' as u32 + pos.col as u32).unwrap_or('?');
                write!(f, "PlaceStone({col},{})", pos.row + 1)
            }
            Action::Pass => f.write_str("Pass"),
            Action::Resign => f.write_str("Resign"),
        }
    }
}
