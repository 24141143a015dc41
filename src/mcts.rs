//! Parallel Monte Carlo Tree Search.
//!
//! A fixed pool of workers shares one [`Tree`] rooted at the real game
//! position. Each worker loops over three kinds of work, in priority order:
//!
//! 1. a pending backpropagation,
//! 2. a pending frontier waiting to be expanded and evaluated,
//! 3. a new frontier found by walking down from the root on a private copy
//!    of the game.
//!
//! Selection applies a virtual loss on every node it passes through, so
//! concurrent walks spread over different branches. Expansion of a slot is
//! guarded by a compare-and-swap on the node's claim flag, and every
//! simulation is reserved from a shared counter before it runs, so exactly
//! `simulations` frontiers are resolved whatever the number of workers.
//!
//! When the counter is spent the workers stop, the remaining queued work is
//! drained, and the move is read from the root: the most visited action,
//! or `Resign` if its value is hopeless.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use log::{debug, info};

use crate::action::Action;
use crate::agent::Agent;
use crate::constants::{
    N_SIMS, N_WORKERS, PASS_INDEX, PUCT_EXPLORATION, RESIGN_THRES, UCT_EXPLORATION,
};
use crate::evaluator::PositionEvaluator;
use crate::expander::{Expander, PriorExpander, RolloutExpander, terminal_value};
use crate::game::GameState;
use crate::node::{NodeId, ROOT, Tree};

/// Search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Frontiers resolved per move
    pub simulations: usize,
    pub workers: usize,
    /// Resign when the best action's value is at or below this
    pub resign_threshold: f64,
    pub exploration: f64,
    /// Seed for the workers' playout generators; random when `None`
    pub seed: Option<u64>,
}

impl SearchConfig {
    pub fn uct() -> Self {
        Self {
            simulations: N_SIMS,
            workers: N_WORKERS,
            resign_threshold: RESIGN_THRES,
            exploration: UCT_EXPLORATION,
            seed: None,
        }
    }

    pub fn puct() -> Self {
        Self {
            exploration: PUCT_EXPLORATION,
            ..Self::uct()
        }
    }

    pub fn with_simulations(mut self, simulations: usize) -> Self {
        self.simulations = simulations;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_resign_threshold(mut self, threshold: f64) -> Self {
        self.resign_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::uct()
    }
}

/// Summary of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub action: Action,
    /// Index of the most visited root action
    pub action_idx: usize,
    pub visits: u32,
    /// Mean value of the most visited root action for the player to move
    pub value: f64,
    pub expansions: usize,
    pub simulations: usize,
    pub tree_size: usize,
}

/// Bounded FIFO shared by the workers. Never blocks.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> WorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Enqueue `item`, handing it back if the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a walk from the root stopped.
#[derive(Debug)]
enum Frontier {
    /// Unexpanded slot `action_idx` of `node`; `game` is the position at `node`.
    Expand {
        node: NodeId,
        action_idx: usize,
        game: GameState,
    },
    /// `node` holds a finished game.
    Terminal { node: NodeId, game: GameState },
}

/// A value to push up the tree, starting at `node`'s parent.
#[derive(Debug, Clone, Copy)]
struct Backprop {
    node: NodeId,
    /// Value from the point of view of the player to move at the parent
    value: f64,
}

/// One search over a shared tree.
struct Search<'a, E: Expander> {
    root_game: &'a GameState,
    expander: &'a E,
    config: &'a SearchConfig,
    tree: Tree,
    simulations: AtomicUsize,
    expansions: AtomicUsize,
    expand_queue: WorkQueue<Frontier>,
    backprop_queue: WorkQueue<Backprop>,
}

impl<'a, E: Expander> Search<'a, E> {
    fn new(root_game: &'a GameState, expander: &'a E, config: &'a SearchConfig) -> Self {
        let capacity = config.workers.max(1);
        Self {
            root_game,
            expander,
            config,
            tree: Tree::new(expander.new_root(root_game)),
            simulations: AtomicUsize::new(0),
            expansions: AtomicUsize::new(0),
            expand_queue: WorkQueue::new(capacity),
            backprop_queue: WorkQueue::new(capacity),
        }
    }

    fn budget_spent(&self) -> bool {
        self.simulations.load(Ordering::Acquire) >= self.config.simulations
    }

    /// Take one simulation from the budget, if any is left.
    fn reserve_simulation(&self) -> bool {
        let budget = self.config.simulations;
        self.simulations
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < budget).then_some(n + 1)
            })
            .is_ok()
    }

    fn run(&self) {
        let workers = self.config.workers.max(1);
        thread::scope(|s| {
            for id in 0..workers {
                s.spawn(move || self.worker(id));
            }
        });

        // Nothing is running now: finish pending results, withdraw the rest.
        while let Some(item) = self.backprop_queue.try_pop() {
            self.backpropagate(item);
        }
        while let Some(frontier) = self.expand_queue.try_pop() {
            self.abandon(&frontier);
        }
    }

    fn worker(&self, id: usize) {
        let mut rng = match self.config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(id as u64)),
            None => fastrand::Rng::new(),
        };
        let mut resolved = 0usize;

        loop {
            if let Some(item) = self.backprop_queue.try_pop() {
                self.backpropagate(item);
                continue;
            }
            if self.budget_spent() {
                break;
            }
            let frontier = match self.expand_queue.try_pop() {
                Some(frontier) => frontier,
                None => match self.expand_queue.try_push(self.select_leaf()) {
                    Ok(()) => continue,
                    Err(frontier) => frontier,
                },
            };
            if self.resolve(frontier, &mut rng) {
                resolved += 1;
            }
        }

        debug!("worker {id} done after resolving {resolved} frontiers");
    }

    /// Walk from the root to a frontier on a private copy of the game.
    fn select_leaf(&self) -> Frontier {
        let mut game = self.root_game.deep_copy();
        let mut id = ROOT;
        loop {
            if game.is_terminal() {
                return Frontier::Terminal { node: id, game };
            }
            let node = self.tree.get(id);
            let action_idx = node.select_best_child_index(self.config.exploration);
            match node.child(action_idx) {
                Some(child) => {
                    let action = game.legal_actions()[action_idx];
                    game.play_action(action);
                    id = child;
                }
                None => {
                    return Frontier::Expand {
                        node: id,
                        action_idx,
                        game,
                    };
                }
            }
        }
    }

    /// Turn a frontier into a value and queue it for backpropagation.
    /// Returns whether a simulation was spent on it.
    fn resolve(&self, frontier: Frontier, rng: &mut fastrand::Rng) -> bool {
        let item = match frontier {
            Frontier::Expand {
                node,
                action_idx,
                game,
            } => {
                let parent = self.tree.get(node);
                if !parent.try_claim(action_idx) {
                    // Someone else is expanding this slot.
                    self.revert_path(node, Some(action_idx));
                    return false;
                }
                if !self.reserve_simulation() {
                    parent.release_claim(action_idx);
                    self.revert_path(node, Some(action_idx));
                    return false;
                }
                let (child, value) =
                    self.expander
                        .expand_and_evaluate(&self.tree, node, action_idx, game, rng);
                self.expansions.fetch_add(1, Ordering::AcqRel);
                Backprop { node: child, value }
            }
            Frontier::Terminal { node, game } => {
                if !self.reserve_simulation() {
                    self.revert_path(node, None);
                    return false;
                }
                Backprop {
                    node,
                    value: terminal_value(&game),
                }
            }
        };

        if let Err(item) = self.backprop_queue.try_push(item) {
            self.backpropagate(item);
        }
        true
    }

    fn backpropagate(&self, item: Backprop) {
        let mut id = item.node;
        let mut value = item.value;
        while let Some(link) = self.tree.get(id).parent() {
            self.tree.get(link.node).update_stats(value, link.action_idx);
            value = -value;
            id = link.node;
        }
    }

    fn abandon(&self, frontier: &Frontier) {
        match *frontier {
            Frontier::Expand {
                node, action_idx, ..
            } => self.revert_path(node, Some(action_idx)),
            Frontier::Terminal { node, .. } => self.revert_path(node, None),
        }
    }

    /// Withdraw the virtual losses a walk ending at `node` left behind.
    fn revert_path(&self, node: NodeId, action_idx: Option<usize>) {
        if let Some(idx) = action_idx {
            self.tree.get(node).revert_virtual_loss(idx);
        }
        let mut id = node;
        while let Some(link) = self.tree.get(id).parent() {
            self.tree.get(link.node).revert_virtual_loss(link.action_idx);
            id = link.node;
        }
    }

    /// Read the chosen move from the root statistics.
    fn reduce(&self) -> SearchOutcome {
        let stats = self.tree.root().snapshot();

        let mut best = PASS_INDEX;
        let mut best_visits = 0;
        for (idx, &visits) in stats.n.iter().enumerate() {
            if visits > best_visits {
                best_visits = visits;
                best = idx;
            }
        }
        let value = stats.q.get(best).copied().unwrap_or(0.0);

        let action = if best_visits > 0 && value <= self.config.resign_threshold {
            Action::Resign
        } else {
            self.root_game.legal_actions()[best]
        };

        SearchOutcome {
            action,
            action_idx: best,
            visits: best_visits,
            value,
            expansions: self.expansions.load(Ordering::Acquire),
            simulations: self.simulations.load(Ordering::Acquire),
            tree_size: self.tree.len(),
        }
    }
}

/// Run one search from `game` and pick a move.
///
/// A finished game is not searched; the outcome is a `Pass` with no visits.
pub fn search<E: Expander>(game: &GameState, expander: &E, config: &SearchConfig) -> SearchOutcome {
    let search = Search::new(game, expander, config);
    if !game.is_terminal() {
        search.run();
    }
    let outcome = search.reduce();
    info!(
        "{} -> {} (visits {}, value {:.3}, {} simulations, {} nodes)",
        game.current_player(),
        outcome.action,
        outcome.visits,
        outcome.value,
        outcome.simulations,
        outcome.tree_size
    );
    outcome
}

/// Agent that searches before every move.
pub struct MctsAgent<E: Expander> {
    config: SearchConfig,
    expander: E,
    last_outcome: Option<SearchOutcome>,
}

/// Plain UCT with random playouts.
pub type UctAgent = MctsAgent<RolloutExpander>;

/// PUCT guided by a position evaluator.
pub type PuctAgent = MctsAgent<PriorExpander>;

impl<E: Expander> MctsAgent<E> {
    pub fn new(config: SearchConfig, expander: E) -> Self {
        Self {
            config,
            expander,
            last_outcome: None,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Statistics of the most recent search.
    pub fn last_outcome(&self) -> Option<&SearchOutcome> {
        self.last_outcome.as_ref()
    }
}

impl UctAgent {
    pub fn uct(config: SearchConfig) -> Self {
        Self::new(config, RolloutExpander)
    }
}

impl PuctAgent {
    pub fn puct(config: SearchConfig, evaluator: Box<dyn PositionEvaluator>) -> Self {
        Self::new(config, PriorExpander::new(evaluator))
    }
}

impl<E: Expander> Agent for MctsAgent<E> {
    fn select_action(&mut self, game: &GameState) -> Action {
        let outcome = search(game, &self.expander, &self.config);
        let action = outcome.action;
        self.last_outcome = Some(outcome);
        action
    }
}
