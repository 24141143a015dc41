//! Go Text Protocol (GTP) implementation.
//!
//! GTP is a text-based protocol for communicating with Go-playing programs.
//! This module implements the core of GTP version 2, enough to drive the
//! engine from graphical Go interfaces like Sabaki or GoGui.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`
//! - `list_commands`, `known_command <cmd>`
//! - `quit`
//! - `boardsize <size>` - Resize and clear the board (2 to 25)
//! - `clear_board` - Reset the board to empty
//! - `komi <value>` - Set komi for the next game
//! - `play <color> <vertex>` - Play a move for the side to move
//! - `genmove <color>` - Ask the agent for a move and play it
//! - `showboard` - Text dump of the board
//! - `final_score` - Area score of the current position
//!
//! Vertices use GTP coordinates: a column letter (skipping `I`) and a row
//! number counted from the bottom edge.

use std::io::{self, BufRead, Write};

use log::{debug, info};

use crate::action::Action;
use crate::agent::Agent;
use crate::board::{Position, Stone};
use crate::constants::{DEFAULT_BOARD_SIZE, DEFAULT_KOMI};
use crate::game::GameState;

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "final_score",
    "genmove",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "version",
];

/// Column letters; `I` is skipped by convention.
const COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

const MIN_BOARD_SIZE: usize = 2;

/// Parse a GTP vertex (`D4`, `pass`, `resign`) on a `height`x`width` board.
pub fn parse_vertex(vertex: &str, height: usize, width: usize) -> Option<Action> {
    let vertex = vertex.to_ascii_uppercase();
    match vertex.as_str() {
        "PASS" => return Some(Action::Pass),
        "RESIGN" => return Some(Action::Resign),
        _ => {}
    }
    let (letter, number) = vertex.split_at_checked(1)?;
    let col = COLUMNS.iter().position(|&c| c == letter.as_bytes()[0])?;
    let number: usize = number.parse().ok()?;
    if col >= width || number == 0 || number > height {
        return None;
    }
    Some(Action::place(height - number, col))
}

/// GTP form of `action` on a board of the given height.
pub fn vertex_string(action: Action, height: usize) -> String {
    match action {
        Action::Pass => "pass".to_string(),
        Action::Resign => "resign".to_string(),
        Action::PlaceStone(Position { row, col }) => {
            format!("{}{}", COLUMNS[col] as char, height - row)
        }
    }
}

fn parse_color(color: &str) -> Option<Stone> {
    match color.to_ascii_lowercase().as_str() {
        "b" | "black" => Some(Stone::Black),
        "w" | "white" => Some(Stone::White),
        _ => None,
    }
}

/// GTP engine state.
pub struct GtpEngine {
    game: GameState,
    size: usize,
    komi: f64,
    agent: Box<dyn Agent>,
}

impl GtpEngine {
    /// Engine on the default board, moves chosen by `agent`.
    pub fn new(agent: Box<dyn Agent>) -> Self {
        Self::with_board(DEFAULT_BOARD_SIZE, DEFAULT_KOMI, agent)
    }

    pub fn with_board(size: usize, komi: f64, agent: Box<dyn Agent>) -> Self {
        Self {
            game: GameState::new(size, size, komi),
            size,
            komi,
            agent,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Run the GTP command loop over stdin and stdout.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        self.run_with(stdin.lock(), io::stdout())
    }

    /// Run the GTP command loop until `quit` or end of input.
    pub fn run_with<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            let command = parts[0].to_lowercase();
            let args = &parts[1..];
            debug!("gtp <- {command_line}");

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();

            write!(output, "{prefix}{id_str} {message}\n\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let mut chars = trimmed.char_indices();

        if let Some((_, c)) = chars.next() {
            if c.is_ascii_digit() {
                let end = chars
                    .find(|(_, c)| !c.is_ascii_digit())
                    .map(|(i, _)| i)
                    .unwrap_or(trimmed.len());

                if let Ok(id) = trimmed[..end].parse::<u32>() {
                    return (Some(id), trimmed[end..].trim());
                }
            }
        }

        (None, trimmed)
    }

    fn reset(&mut self) {
        self.game = GameState::new(self.size, self.size, self.komi);
    }

    /// Execute a GTP command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "2".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let Some(name) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let known = KNOWN_COMMANDS.contains(&name.to_lowercase().as_str());
                (true, known.to_string())
            }

            "quit" => (true, String::new()),

            "boardsize" => {
                let Some(arg) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                match arg.parse::<usize>() {
                    Ok(size) if (MIN_BOARD_SIZE..=COLUMNS.len()).contains(&size) => {
                        self.size = size;
                        self.reset();
                        (true, String::new())
                    }
                    Ok(_) => (false, "unacceptable size".to_string()),
                    Err(_) => (false, "invalid size".to_string()),
                }
            }

            "clear_board" => {
                self.reset();
                (true, String::new())
            }

            "komi" => {
                let Some(arg) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                match arg.parse::<f64>() {
                    Ok(komi) => {
                        self.komi = komi;
                        // Only an untouched game picks the new value up.
                        if self.game.hash_history().len() == 1 {
                            self.reset();
                        }
                        (true, String::new())
                    }
                    Err(_) => (false, "invalid komi".to_string()),
                }
            }

            "play" => {
                if args.len() < 2 {
                    return (false, "missing arguments".to_string());
                }
                let Some(color) = parse_color(args[0]) else {
                    return (false, "invalid color".to_string());
                };
                if color != self.game.current_player() {
                    return (false, format!("illegal move: {color} is not to move"));
                }
                let Some(action) = parse_vertex(args[1], self.size, self.size) else {
                    return (false, "invalid vertex".to_string());
                };
                if self.game.is_terminal() || !self.game.is_legal(&action) {
                    return (false, "illegal move".to_string());
                }
                self.game.play_action(action);
                (true, String::new())
            }

            "genmove" => {
                let Some(color) = args.first().and_then(|c| parse_color(c)) else {
                    return (false, "invalid color".to_string());
                };
                if color != self.game.current_player() {
                    return (false, format!("{color} is not to move"));
                }
                if self.game.is_terminal() {
                    return (true, "pass".to_string());
                }
                let action = self.agent.select_action(&self.game);
                info!("genmove {color}: {action}");
                self.game.play_action(action);
                (true, vertex_string(action, self.size))
            }

            "showboard" => (true, format!("\n{}", self.game)),

            "final_score" => (true, self.final_score()),

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn final_score(&self) -> String {
        let resigned = self.game.board().resigned;
        if resigned != Stone::Empty {
            return match resigned {
                Stone::Black => "W+R".to_string(),
                _ => "B+R".to_string(),
            };
        }
        let score = self.game.compute_score();
        let margin = score.black - score.white;
        if margin > 0.0 {
            format!("B+{margin}")
        } else if margin < 0.0 {
            format!("W+{}", -margin)
        } else {
            "0".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::agent::RandomAgent;

    fn engine() -> GtpEngine {
        GtpEngine::new(Box::new(RandomAgent::with_seed(4)))
    }

    #[test]
    fn test_parse_id_with_id() {
        let (id, cmd) = GtpEngine::parse_id("123 name");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_parse_id_without_id() {
        let (id, cmd) = GtpEngine::parse_id("name");
        assert_eq!(id, None);
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_vertices() {
        assert_eq!(parse_vertex("A1", 9, 9), Some(Action::place(8, 0)));
        assert_eq!(parse_vertex("j9", 9, 9), Some(Action::place(0, 8)));
        assert_eq!(parse_vertex("PASS", 9, 9), Some(Action::Pass));
        assert_eq!(parse_vertex("I5", 9, 9), None);
        assert_eq!(parse_vertex("A10", 9, 9), None);
        assert_eq!(parse_vertex("K1", 9, 9), None);
        assert_eq!(parse_vertex("", 9, 9), None);

        assert_eq!(vertex_string(Action::place(8, 0), 9), "A1");
        assert_eq!(vertex_string(Action::place(4, 8), 9), "J5");
        assert_eq!(vertex_string(Action::Resign, 9), "resign");
    }

    #[test]
    fn test_name_command() {
        let mut engine = engine();
        let (success, response) = engine.execute("name", &[]);
        assert!(success);
        assert_eq!(response, env!("CARGO_PKG_NAME"));
    }

    #[test]
    fn test_protocol_version() {
        let mut engine = engine();
        let (success, response) = engine.execute("protocol_version", &[]);
        assert!(success);
        assert_eq!(response, "2");
    }

    #[test]
    fn test_known_command() {
        let mut engine = engine();

        let (success, response) = engine.execute("known_command", &["showboard"]);
        assert!(success);
        assert_eq!(response, "true");

        let (success, response) = engine.execute("known_command", &["unknown_cmd"]);
        assert!(success);
        assert_eq!(response, "false");
    }

    #[test]
    fn test_boardsize() {
        let mut engine = engine();

        let (success, _) = engine.execute("boardsize", &["13"]);
        assert!(success);
        assert_eq!(engine.game().board().height(), 13);

        let (success, _) = engine.execute("boardsize", &["1"]);
        assert!(!success);
        let (success, _) = engine.execute("boardsize", &["26"]);
        assert!(!success);
    }

    #[test]
    fn test_play_and_clear() {
        let mut engine = engine();

        let (success, _) = engine.execute("play", &["black", "D4"]);
        assert!(success);
        assert_eq!(engine.game().board().get(Position::new(5, 3)), Stone::Black);

        // Same point again, and the wrong colour
        let (success, _) = engine.execute("play", &["white", "D4"]);
        assert!(!success);
        let (success, _) = engine.execute("play", &["black", "E5"]);
        assert!(!success);

        let (success, _) = engine.execute("clear_board", &[]);
        assert!(success);
        assert_eq!(engine.game().board().stone_count(), 0);
    }

    #[test]
    fn test_genmove_plays_legal_move() {
        let mut engine = engine();
        let (success, vertex) = engine.execute("genmove", &["b"]);
        assert!(success);
        assert_eq!(engine.game().current_player(), Stone::White);
        assert!(parse_vertex(&vertex, 9, 9).is_some());
        assert_ne!(vertex, "resign");
    }

    #[test]
    fn test_final_score() {
        let mut engine = engine();
        engine.execute("komi", &["0.5"]);
        let (_, score) = engine.execute("final_score", &[]);
        assert_eq!(score, "W+0.5");

        engine.execute("play", &["b", "E5"]);
        let (_, score) = engine.execute("final_score", &[]);
        assert_eq!(score, "B+80.5");

        engine.execute("play", &["w", "resign"]);
        let (_, score) = engine.execute("final_score", &[]);
        assert_eq!(score, "B+R");
    }

    #[test]
    fn test_run_session() {
        let mut engine = engine();
        let input = Cursor::new("1 boardsize 5\n# comment\n2 play b C3\n3 showboard\nquit\nname\n");
        let mut output = Vec::new();
        engine.run_with(input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("=1 \n\n=2 \n\n=3 \n"));
        assert!(text.contains(". . X . ."));
        assert!(text.ends_with("= \n\n"));
        // Nothing is answered after quit.
        assert_eq!(text.matches('=').count(), 4);
    }
}
