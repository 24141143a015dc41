//! GoGo-MCTS: a Go engine driven by parallel MCTS.
//!
//! ## Usage
//!
//! - `gogo-mcts` - Show a demo
//! - `gogo-mcts gtp` - Start GTP server for GUI integration
//! - `gogo-mcts selfplay --black uct --white random` - Play one game
//! - `gogo-mcts demo` - Run the MCTS demo

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use gogo_mcts::action::Action;
use gogo_mcts::agent::{Agent, RandomAgent};
use gogo_mcts::arena::play_match;
use gogo_mcts::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_KOMI, MAX_GAME_LEN_FACTOR, N_SIMS, N_WORKERS, RESIGN_THRES,
};
use gogo_mcts::evaluator::{PositionEvaluator, TcpEvaluator, UniformEvaluator};
use gogo_mcts::game::GameState;
use gogo_mcts::gtp::GtpEngine;
use gogo_mcts::logging::setup_logging;
use gogo_mcts::mcts::{PuctAgent, SearchConfig, UctAgent};

/// GoGo-MCTS: a Go engine driven by parallel Monte Carlo Tree Search
#[derive(Parser)]
#[command(name = "gogo-mcts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the GTP (Go Text Protocol) server for use with GUI applications
    Gtp {
        /// Agent answering genmove
        #[arg(long, value_enum, default_value_t = AgentKind::Uct)]
        agent: AgentKind,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Play one game between two agents
    Selfplay {
        #[arg(long, value_enum, default_value_t = AgentKind::Uct)]
        black: AgentKind,

        #[arg(long, value_enum, default_value_t = AgentKind::Random)]
        white: AgentKind,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Run a simple demo of the engine
    Demo,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    Random,
    Uct,
    Puct,
}

#[derive(Args, Clone, Debug)]
struct EngineArgs {
    /// Board size (NxN)
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
    size: usize,

    #[arg(long, default_value_t = DEFAULT_KOMI, allow_negative_numbers = true)]
    komi: f64,

    /// Simulations per move
    #[arg(long, default_value_t = N_SIMS)]
    sims: usize,

    /// Concurrent search workers
    #[arg(long, default_value_t = N_WORKERS)]
    workers: usize,

    /// Resign when the best move's value falls to this
    #[arg(long, default_value_t = RESIGN_THRES, allow_negative_numbers = true)]
    resign: f64,

    /// host:port of a position evaluation service for the PUCT agent
    #[arg(long)]
    evaluator: Option<String>,
}

impl EngineArgs {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (2..=25).contains(&self.size),
            "board size must be between 2 and 25, got {}",
            self.size
        );
        anyhow::ensure!(self.workers > 0, "at least one search worker is needed");
        Ok(())
    }

    fn search_config(&self, base: SearchConfig) -> SearchConfig {
        base.with_simulations(self.sims)
            .with_workers(self.workers)
            .with_resign_threshold(self.resign)
    }

    fn evaluator(&self) -> anyhow::Result<Box<dyn PositionEvaluator>> {
        Ok(match &self.evaluator {
            Some(addr) => Box::new(
                TcpEvaluator::new(addr.as_str())
                    .with_context(|| format!("resolving evaluator address {addr}"))?,
            ),
            None => Box::new(UniformEvaluator),
        })
    }

    fn agent(&self, kind: AgentKind) -> anyhow::Result<Box<dyn Agent>> {
        Ok(match kind {
            AgentKind::Random => Box::new(RandomAgent::new()),
            AgentKind::Uct => Box::new(UctAgent::uct(self.search_config(SearchConfig::uct()))),
            AgentKind::Puct => Box::new(PuctAgent::puct(
                self.search_config(SearchConfig::puct()),
                self.evaluator()?,
            )),
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logger = setup_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Gtp { agent, engine }) => {
            engine.validate()?;
            let mut gtp = GtpEngine::with_board(engine.size, engine.komi, engine.agent(agent)?);
            gtp.run()?;
        }
        Some(Commands::Selfplay {
            black,
            white,
            engine,
        }) => run_selfplay(black, white, &engine)?,
        Some(Commands::Demo) | None => run_demo(),
    }
    Ok(())
}

fn run_selfplay(black: AgentKind, white: AgentKind, engine: &EngineArgs) -> anyhow::Result<()> {
    engine.validate()?;
    let mut black_agent = engine.agent(black)?;
    let mut white_agent = engine.agent(white)?;
    let game = GameState::new(engine.size, engine.size, engine.komi);
    let max_moves = MAX_GAME_LEN_FACTOR * engine.size * engine.size;

    info!("selfplay: {black:?} (Black) vs {white:?} (White) on {0}x{0}", engine.size);
    let (result, end) = play_match(black_agent.as_mut(), white_agent.as_mut(), game, max_moves);

    println!("{end}");
    println!(
        "Winner: {} after {} moves (Black {:.1}, White {:.1})",
        result.winner, result.moves, result.score.black, result.score.white
    );
    Ok(())
}

fn run_demo() {
    println!("GoGo-MCTS: parallel MCTS Go engine\n");

    println!("=== Rules Demo ===");
    let mut game = GameState::new(DEFAULT_BOARD_SIZE, DEFAULT_BOARD_SIZE, DEFAULT_KOMI);
    for action in [Action::place(2, 2), Action::place(6, 6)] {
        println!("{} plays {action}", game.current_player());
        game.play_action(action);
    }
    println!("{game}");
    println!("Legal actions for {}: {}\n", game.current_player(), game.legal_actions().len());

    println!("=== MCTS Demo ===");
    let config = SearchConfig::uct().with_simulations(200).with_workers(4);
    println!(
        "Running {} simulations on {} workers...",
        config.simulations, config.workers
    );
    let mut agent = UctAgent::uct(config);
    let best = agent.select_action(&game);
    println!("Best move: {best}");
    if let Some(outcome) = agent.last_outcome() {
        println!(
            "Visits: {}, value: {:.3}, tree size: {}",
            outcome.visits, outcome.value, outcome.tree_size
        );
    }
}
