//! Default game and search parameters.
//!
//! Everything here is a default: board dimensions, komi and the search
//! budget can all be overridden at runtime through [`crate::mcts::SearchConfig`]
//! or the command line.

// =============================================================================
// Game Defaults
// =============================================================================

/// Default board size (NxN).
pub const DEFAULT_BOARD_SIZE: usize = 9;

/// Default komi (compensation points for White).
pub const DEFAULT_KOMI: f64 = 6.5;

/// Rollouts and matches stop after this many actions per board cell.
pub const MAX_GAME_LEN_FACTOR: usize = 3;

// =============================================================================
// Legal Action Layout
// =============================================================================

/// Index of `Resign` in every legal action list.
pub const RESIGN_INDEX: usize = 0;

/// Index of `Pass` in every legal action list.
pub const PASS_INDEX: usize = 1;

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Default number of simulations per move.
pub const N_SIMS: usize = 1400;

/// Default number of concurrent search workers.
pub const N_WORKERS: usize = 8;

/// Root value at or below which the engine resigns.
pub const RESIGN_THRES: f64 = -0.9;

/// UCT exploration constant.
pub const UCT_EXPLORATION: f64 = std::f64::consts::SQRT_2;

/// PUCT exploration constant.
pub const PUCT_EXPLORATION: f64 = 1.0;

// =============================================================================
// External Evaluation
// =============================================================================

/// Connect/read timeout for the TCP evaluation service, in milliseconds.
pub const EVALUATOR_TIMEOUT_MS: u64 = 2000;
