//! Position evaluation for the prior-weighted search.
//!
//! An evaluator maps a position to a value in `[-1, 1]` for the player to
//! move and, optionally, a prior over that player's legal actions. The
//! [`TcpEvaluator`] talks to an external service with one JSON object per
//! line; [`UniformEvaluator`] needs nothing and answers "no opinion".

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::board::{Position, Stone};
use crate::constants::EVALUATOR_TIMEOUT_MS;
use crate::game::GameState;
use crate::node::uniform_priors;

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluator I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed evaluator message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("evaluator closed the connection without answering")]
    Closed,

    #[error("evaluator value {0} is outside [-1, 1]")]
    ValueOutOfRange(f64),
}

/// Position as sent to an evaluation service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub height: usize,
    pub width: usize,
    /// Row-major cells: 1 for the side to move, -1 for the opponent, 0 empty
    pub cells: Vec<i8>,
    pub legal_actions: Vec<Action>,
}

impl EvaluationRequest {
    pub fn from_game(game: &GameState) -> Self {
        let board = game.board();
        let me = game.current_player();
        let cells = board
            .positions()
            .map(|pos: Position| match board.get(pos) {
                Stone::Empty => 0,
                stone if stone == me => 1,
                _ => -1,
            })
            .collect();
        Self {
            height: board.height(),
            width: board.width(),
            cells,
            legal_actions: game.legal_actions().to_vec(),
        }
    }
}

/// Service answer: value for the side to move and a prior per legal action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub value: f64,
    /// May be empty, in which case the search uses uniform priors.
    #[serde(default)]
    pub priors: Vec<f64>,
}

impl Evaluation {
    /// Value 0 with uniform priors over `num_actions` actions.
    pub fn neutral(num_actions: usize) -> Self {
        Self {
            value: 0.0,
            priors: uniform_priors(num_actions),
        }
    }
}

pub trait PositionEvaluator: Send + Sync {
    fn evaluate(&self, game: &GameState) -> Result<Evaluation, EvaluatorError>;
}

/// Evaluate, falling back to a neutral answer on any failure.
pub fn evaluate_or_neutral(evaluator: &dyn PositionEvaluator, game: &GameState) -> Evaluation {
    match evaluator.evaluate(game) {
        Ok(evaluation) => evaluation,
        Err(e) => {
            warn!("position evaluation failed, using neutral value: {e}");
            Evaluation::neutral(game.legal_actions().len())
        }
    }
}

/// Evaluator that knows nothing about Go.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformEvaluator;

impl PositionEvaluator for UniformEvaluator {
    fn evaluate(&self, game: &GameState) -> Result<Evaluation, EvaluatorError> {
        Ok(Evaluation::neutral(game.legal_actions().len()))
    }
}

/// Client for an evaluation service speaking JSON lines over TCP.
///
/// Each request opens a new connection, writes one [`EvaluationRequest`]
/// line and reads one [`Evaluation`] line back.
#[derive(Debug, Clone)]
pub struct TcpEvaluator {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpEvaluator {
    pub fn new(addr: impl ToSocketAddrs) -> Result<Self, EvaluatorError> {
        let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address to connect to")
        })?;
        Ok(Self {
            addr,
            timeout: Duration::from_millis(EVALUATOR_TIMEOUT_MS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl PositionEvaluator for TcpEvaluator {
    fn evaluate(&self, game: &GameState) -> Result<Evaluation, EvaluatorError> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut line = serde_json::to_string(&EvaluationRequest::from_game(game))?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;
        stream.flush()?;

        let mut reply = String::new();
        if BufReader::new(stream).read_line(&mut reply)? == 0 {
            return Err(EvaluatorError::Closed);
        }
        let evaluation: Evaluation = serde_json::from_str(reply.trim())?;
        if !(-1.0..=1.0).contains(&evaluation.value) {
            return Err(EvaluatorError::ValueOutOfRange(evaluation.value));
        }
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serve one connection with a canned reply; hands back the request line.
    fn serve_once(reply: &'static str) -> (SocketAddr, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            reader.read_line(&mut request).unwrap();
            let mut stream = stream;
            stream.write_all(reply.as_bytes()).unwrap();
            request
        });
        (addr, handle)
    }

    #[test]
    fn test_request_encoding() {
        let mut game = GameState::with_seed(2, 2, 0.5, 1);
        game.play_action(Action::place(0, 0));
        let request = EvaluationRequest::from_game(&game);
        // White to move: the black stone is the opponent's.
        assert_eq!(request.cells, vec![-1, 0, 0, 0]);
        assert_eq!(request.legal_actions[0], Action::Resign);
        assert_eq!(request.legal_actions.len(), game.legal_actions().len());
    }

    #[test]
    fn test_uniform_evaluator() {
        let game = GameState::with_seed(3, 3, 0.5, 1);
        let eval = UniformEvaluator.evaluate(&game).unwrap();
        assert_eq!(eval.value, 0.0);
        assert_eq!(eval.priors.len(), 11);
        assert!((eval.priors.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tcp_round_trip() {
        let (addr, server) = serve_once("{\"value\":0.25,\"priors\":[0.5,0.5]}\n");
        let game = GameState::with_seed(3, 3, 0.5, 1);
        let eval = TcpEvaluator::new(addr).unwrap().evaluate(&game).unwrap();
        assert_eq!(eval.value, 0.25);
        assert_eq!(eval.priors, vec![0.5, 0.5]);

        let request: EvaluationRequest = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(request.height, 3);
        assert_eq!(request.cells, vec![0; 9]);
    }

    #[test]
    fn test_tcp_missing_priors_default_to_empty() {
        let (addr, server) = serve_once("{\"value\":-1.0}\n");
        let game = GameState::with_seed(3, 3, 0.5, 1);
        let eval = TcpEvaluator::new(addr).unwrap().evaluate(&game).unwrap();
        assert_eq!(eval.value, -1.0);
        assert!(eval.priors.is_empty());
        server.join().unwrap();
    }

    #[test]
    fn test_tcp_rejects_out_of_range_value() {
        let (addr, server) = serve_once("{\"value\":3.0}\n");
        let game = GameState::with_seed(3, 3, 0.5, 1);
        let err = TcpEvaluator::new(addr).unwrap().evaluate(&game).unwrap_err();
        assert!(matches!(err, EvaluatorError::ValueOutOfRange(v) if v == 3.0));
        server.join().unwrap();
    }

    #[test]
    fn test_tcp_malformed_reply() {
        let (addr, server) = serve_once("not json\n");
        let game = GameState::with_seed(3, 3, 0.5, 1);
        let err = TcpEvaluator::new(addr).unwrap().evaluate(&game).unwrap_err();
        assert!(matches!(err, EvaluatorError::Decode(_)));
        server.join().unwrap();
    }

    #[test]
    fn test_tcp_closed_without_reply() {
        let (addr, server) = serve_once("");
        let game = GameState::with_seed(3, 3, 0.5, 1);
        let err = TcpEvaluator::new(addr).unwrap().evaluate(&game).unwrap_err();
        assert!(matches!(err, EvaluatorError::Closed));
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_service_falls_back_to_neutral() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let evaluator = TcpEvaluator::new(addr)
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let game = GameState::with_seed(3, 3, 0.5, 1);
        assert!(evaluator.evaluate(&game).is_err());

        let eval = evaluate_or_neutral(&evaluator, &game);
        assert_eq!(eval, Evaluation::neutral(11));
    }
}
