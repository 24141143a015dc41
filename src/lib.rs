//! GoGo-MCTS: a Go engine driven by parallel Monte Carlo Tree Search.
//!
//! The rules engine tracks groups with a union-find structure, enforces
//! positional superko with Zobrist hashes and scores by area. On top of it a
//! pool of workers shares one search tree, either plain UCT with random
//! playouts or PUCT guided by an external position evaluator.
//!
//! ## Modules
//!
//! - [`constants`] - Default game and search parameters
//! - [`board`] - Stones, positions and the grid
//! - [`union_find`] - Group membership and liberty counts
//! - [`hasher`] - Zobrist hashing and position history
//! - [`action`] - Place, pass and resign
//! - [`game`] - Rules: legality, captures, scoring
//! - [`node`] - Search tree nodes (UCT and PUCT selection)
//! - [`playout`] - Random game simulation for position evaluation
//! - [`evaluator`] - External position evaluation service
//! - [`expander`] - Leaf expansion strategies
//! - [`mcts`] - Parallel search scheduler and the search agent
//! - [`agent`] - The agent contract and a random agent
//! - [`arena`] - Agent-vs-agent matches
//! - [`gtp`] - Go Text Protocol front end
//! - [`logging`] - Logger bootstrap for the binary
//!
//! ## Example
//!
//! ```
//! use gogo_mcts::action::Action;
//! use gogo_mcts::agent::Agent;
//! use gogo_mcts::game::GameState;
//! use gogo_mcts::mcts::{SearchConfig, UctAgent};
//!
//! // Create a new game and play a move
//! let mut game = GameState::new(9, 9, 6.5);
//! game.play_action(Action::place(4, 4));
//!
//! // Search for White's reply
//! let mut agent = UctAgent::uct(SearchConfig::uct().with_simulations(100).with_workers(2));
//! let reply = agent.select_action(&game);
//! println!("White plays {reply}");
//! ```

pub mod action;
pub mod agent;
pub mod arena;
pub mod board;
pub mod constants;
pub mod evaluator;
pub mod expander;
pub mod game;
pub mod gtp;
pub mod hasher;
pub mod logging;
pub mod mcts;
pub mod node;
pub mod playout;
pub mod union_find;
