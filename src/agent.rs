//! Move-choosing policies.

use crate::action::Action;
use crate::game::GameState;
use crate::playout::random_non_resign_action;

/// A policy that picks one of `game`'s legal actions.
pub trait Agent {
    fn select_action(&mut self, game: &GameState) -> Action;
}

/// Uniformly random legal moves. Never resigns.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: fastrand::Rng,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn select_action(&mut self, game: &GameState) -> Action {
        random_non_resign_action(game, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_agent_plays_legal_moves() {
        let mut agent = RandomAgent::with_seed(11);
        let mut game = GameState::with_seed(5, 5, 0.5, 1);
        for _ in 0..30 {
            if game.is_terminal() {
                break;
            }
            let action = agent.select_action(&game);
            assert!(game.is_legal(&action));
            assert_ne!(action, Action::Resign);
            game.play_action(action);
        }
    }

    #[test]
    fn test_boxed_agent() {
        let mut agent: Box<dyn Agent> = Box::new(RandomAgent::with_seed(2));
        let game = GameState::with_seed(3, 3, 0.5, 1);
        assert!(game.is_legal(&agent.select_action(&game)));
    }
}
