//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays uniformly random legal actions, never resigning, until the
//! game ends or the length cap is hit, then scores the result.

use crate::action::Action;
use crate::board::Stone;
use crate::constants::{MAX_GAME_LEN_FACTOR, RESIGN_INDEX};
use crate::game::GameState;

/// Play a random game from `game` to the end.
///
/// Returns +1, 0 or -1 from the perspective of the player to move at the
/// start of the playout.
pub fn rollout(mut game: GameState, rng: &mut fastrand::Rng) -> f64 {
    let player = game.current_player();
    let cap = MAX_GAME_LEN_FACTOR * game.board().height() * game.board().width();

    let mut moves = 0;
    while !game.is_terminal() && moves < cap {
        let action = random_non_resign_action(&game, rng);
        game.play_action(action);
        moves += 1;
    }

    outcome_for(&game, player)
}

/// Uniformly random legal action other than `Resign`.
pub fn random_non_resign_action(game: &GameState, rng: &mut fastrand::Rng) -> Action {
    let choices = &game.legal_actions()[RESIGN_INDEX + 1..];
    choices[rng.usize(..choices.len())]
}

/// +1 if `player` wins the game as it stands, -1 if it loses, 0 for a draw.
pub fn outcome_for(game: &GameState, player: Stone) -> f64 {
    match game.get_winner() {
        Stone::Empty => 0.0,
        winner if winner == player => 1.0,
        _ => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollout_result_in_range() {
        let mut rng = fastrand::Rng::with_seed(42);
        for seed in 0..5 {
            let game = GameState::with_seed(5, 5, 0.5, seed);
            let v = rollout(game, &mut rng);
            assert!(v == 1.0 || v == 0.0 || v == -1.0);
        }
    }

    #[test]
    fn test_rollout_does_not_touch_input() {
        let mut rng = fastrand::Rng::with_seed(1);
        let game = GameState::with_seed(5, 5, 0.5, 1);
        let _ = rollout(game.deep_copy(), &mut rng);
        assert_eq!(game.board().stone_count(), 0);
        assert_eq!(game.hash_history().len(), 1);
    }

    #[test]
    fn test_rollout_of_finished_game_scores_it() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut game = GameState::with_seed(3, 3, 0.5, 1);
        game.play_action(Action::Pass);
        game.play_action(Action::Pass);
        // Black to move, empty board, komi decides for White.
        assert_eq!(game.current_player(), Stone::Black);
        assert_eq!(rollout(game, &mut rng), -1.0);
    }

    #[test]
    fn test_random_action_never_resigns() {
        let mut rng = fastrand::Rng::with_seed(9);
        let game = GameState::with_seed(3, 3, 0.5, 1);
        for _ in 0..200 {
            assert_ne!(random_non_resign_action(&game, &mut rng), Action::Resign);
        }
    }

    #[test]
    fn test_outcome_perspective() {
        let mut game = GameState::with_seed(3, 3, 0.5, 1);
        game.play_action(Action::Resign);
        assert_eq!(outcome_for(&game, Stone::White), 1.0);
        assert_eq!(outcome_for(&game, Stone::Black), -1.0);
    }
}
