//! Play two agents against each other.

use log::{debug, info};

use crate::agent::Agent;
use crate::board::Stone;
use crate::game::{GameState, Score};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// `Empty` for a draw
    pub winner: Stone,
    pub score: Score,
    /// Actions played, including passes and a final resignation
    pub moves: usize,
}

/// Alternate `black` and `white` from `game` until it ends or `max_moves`
/// actions have been played, then score the board as it stands.
pub fn play_match(
    black: &mut dyn Agent,
    white: &mut dyn Agent,
    mut game: GameState,
    max_moves: usize,
) -> (MatchResult, GameState) {
    let mut moves = 0;
    while !game.is_terminal() && moves < max_moves {
        let player = game.current_player();
        let action = match player {
            Stone::White => white.select_action(&game),
            _ => black.select_action(&game),
        };
        debug!("move {}: {player} plays {action}", moves + 1);
        game.play_action(action);
        moves += 1;
    }

    let result = MatchResult {
        winner: game.get_winner(),
        score: game.compute_score(),
        moves,
    };
    info!(
        "game over after {} moves: winner {} (B {:.1} / W {:.1})",
        result.moves, result.winner, result.score.black, result.score.white
    );
    (result, game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::agent::RandomAgent;

    struct Passer;

    impl Agent for Passer {
        fn select_action(&mut self, _: &GameState) -> Action {
            Action::Pass
        }
    }

    struct Resigner;

    impl Agent for Resigner {
        fn select_action(&mut self, _: &GameState) -> Action {
            Action::Resign
        }
    }

    #[test]
    fn test_two_passes_end_match() {
        let game = GameState::with_seed(5, 5, 0.5, 1);
        let (result, end) = play_match(&mut Passer, &mut Passer, game, 100);
        assert_eq!(result.moves, 2);
        assert_eq!(result.winner, Stone::White);
        assert!(end.is_terminal());
    }

    #[test]
    fn test_resignation() {
        let game = GameState::with_seed(5, 5, 0.5, 1);
        let (result, _) = play_match(&mut Resigner, &mut Passer, game, 100);
        assert_eq!(result.moves, 1);
        assert_eq!(result.winner, Stone::White);
    }

    #[test]
    fn test_move_cap() {
        let game = GameState::with_seed(5, 5, 0.5, 1);
        let mut black = RandomAgent::with_seed(1);
        let mut white = RandomAgent::with_seed(2);
        let (result, end) = play_match(&mut black, &mut white, game, 10);
        assert!(result.moves <= 10);
        assert_eq!(end.hash_history().len(), result.moves + 1);
    }
}
