//! UCI (Universal Chess Interface) protocol library, GUI side.
//!
//! This crate provides the vocabulary a program needs to drive an external
//! analysis engine such as Stockfish: the commands it may send, how each
//! command's reply is recognized as complete, and parsing of the textual
//! replies into structured evaluations.
//!
//! # Commands sent to the engine
//!
//! - `uci` / `uciok` - Initialize engine, get id
//! - `isready` / `readyok` - Synchronization
//! - `setoption name <name> value <value>` - Configure the engine
//! - `ucinewgame` - Reset search state between games
//! - `position fen <fen>` - Set position
//! - `go depth <d>` - Start a search, answered by `bestmove`
//! - `eval` - Static evaluation (Stockfish extension), answered by `Final evaluation`
//! - `stop` / `quit`
//!
//! # Replies
//!
//! The engine's output is an unframed stream of lines. A reply is complete
//! when a line matches the [`ReplyTerminator`] of the command that caused it.
//! [`parse_evaluation`] and [`parse_best_move`] extract facts from a
//! complete reply.

mod command;
mod info;
mod reply;

pub use command::{EngineCommand, GoOptions, ReplyTerminator};
pub use info::{EngineInfo, Score, ScoreBound, MATE_VALUE};
pub use reply::{parse_best_move, parse_engine_name, parse_evaluation, Evaluation, Perspective};

use thiserror::Error;

/// Errors produced while interpreting engine output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The reply did not contain the fields the caller asked for.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),
}
