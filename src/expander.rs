//! Leaf expansion and evaluation.
//!
//! The scheduler hands an [`Expander`] a frontier: a node, one of its
//! unexpanded action slots, and a private copy of the game at that node.
//! The expander plays the action, installs the child node in the tree and
//! returns the value of the result for the player who chose the action.

use crate::board::Stone;
use crate::evaluator::{PositionEvaluator, evaluate_or_neutral};
use crate::game::GameState;
use crate::node::{NodeId, ParentLink, SearchNode, Tree};
use crate::playout::{outcome_for, rollout};

pub trait Expander: Sync {
    /// Root node for a search from `game`.
    fn new_root(&self, game: &GameState) -> SearchNode;

    /// Expand `action_idx` of `parent` and evaluate the new child.
    ///
    /// `game` is the position at `parent`. Returns the child's id and its
    /// value from the parent's point of view.
    fn expand_and_evaluate(
        &self,
        tree: &Tree,
        parent: NodeId,
        action_idx: usize,
        game: GameState,
        rng: &mut fastrand::Rng,
    ) -> (NodeId, f64);
}

fn play_slot(game: &mut GameState, action_idx: usize) {
    let action = game.legal_actions()[action_idx];
    game.play_action(action);
}

fn install(tree: &Tree, parent: NodeId, action_idx: usize, child: SearchNode) -> NodeId {
    let id = tree.insert(child);
    tree.get(parent).set_child(action_idx, id);
    id
}

/// Plain UCT: uniform children, random playouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolloutExpander;

impl Expander for RolloutExpander {
    fn new_root(&self, game: &GameState) -> SearchNode {
        SearchNode::uct(game.legal_actions().len(), None)
    }

    fn expand_and_evaluate(
        &self,
        tree: &Tree,
        parent: NodeId,
        action_idx: usize,
        mut game: GameState,
        rng: &mut fastrand::Rng,
    ) -> (NodeId, f64) {
        play_slot(&mut game, action_idx);
        let link = ParentLink {
            node: parent,
            action_idx,
        };
        let child = install(
            tree,
            parent,
            action_idx,
            SearchNode::uct(game.legal_actions().len(), Some(link)),
        );
        (child, -rollout(game, rng))
    }
}

/// PUCT: children carry priors and values from a [`PositionEvaluator`].
pub struct PriorExpander {
    evaluator: Box<dyn PositionEvaluator>,
}

impl PriorExpander {
    pub fn new(evaluator: Box<dyn PositionEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl Expander for PriorExpander {
    fn new_root(&self, game: &GameState) -> SearchNode {
        let evaluation = evaluate_or_neutral(self.evaluator.as_ref(), game);
        SearchNode::puct(game.legal_actions().len(), None, evaluation.priors)
    }

    fn expand_and_evaluate(
        &self,
        tree: &Tree,
        parent: NodeId,
        action_idx: usize,
        mut game: GameState,
        _rng: &mut fastrand::Rng,
    ) -> (NodeId, f64) {
        play_slot(&mut game, action_idx);
        let num_actions = game.legal_actions().len();

        // Finished games are scored exactly.
        let (value, priors) = if game.is_terminal() {
            (outcome_for(&game, game.current_player()), Vec::new())
        } else {
            let evaluation = evaluate_or_neutral(self.evaluator.as_ref(), &game);
            (evaluation.value, evaluation.priors)
        };

        let link = ParentLink {
            node: parent,
            action_idx,
        };
        let child = install(
            tree,
            parent,
            action_idx,
            SearchNode::puct(num_actions, Some(link), priors),
        );
        (child, -value)
    }
}

/// Value of a terminal position for the player who moved into it.
pub fn terminal_value(game: &GameState) -> f64 {
    match game.get_winner() {
        Stone::Empty => 0.0,
        winner if winner == game.current_player() => -1.0,
        _ => 1.0,
    }
}
