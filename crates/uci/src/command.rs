//! UCI command formatting.

use std::fmt;

/// Commands sent from the GUI (this program) to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Forget search state from a previous game.
    UciNewGame,
    /// Set up position.
    Position { fen: String },
    /// Start calculating.
    Go(GoOptions),
    /// Print the static evaluation of the current position.
    Eval,
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
}

impl GoOptions {
    /// Search to a fixed depth.
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }
}

/// Recognizes the last line of a command's reply.
///
/// The engine writes no length prefix or end-of-reply marker, so the only
/// way to know a reply is complete is to look for the line that the
/// protocol guarantees comes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTerminator {
    /// `uciok`, after the `id` and `option` lines.
    UciOk,
    /// `readyok`.
    ReadyOk,
    /// `bestmove <move> [ponder <move>]`, after any number of `info` lines.
    BestMove,
    /// `Final evaluation ...`, after the evaluation trace.
    FinalEvaluation,
}

impl ReplyTerminator {
    /// Returns true if `line` ends a reply of this kind.
    pub fn matches(self, line: &str) -> bool {
        let line = line.trim();
        match self {
            ReplyTerminator::UciOk => line == "uciok",
            ReplyTerminator::ReadyOk => line == "readyok",
            ReplyTerminator::BestMove => {
                line == "bestmove" || line.starts_with("bestmove ")
            }
            ReplyTerminator::FinalEvaluation => line.starts_with("Final evaluation"),
        }
    }
}

impl EngineCommand {
    /// Build a `setoption` command.
    pub fn set_option(name: impl Into<String>, value: impl ToString) -> Self {
        EngineCommand::SetOption {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Format command for output (without trailing newline).
    pub fn to_uci(&self) -> String {
        match self {
            EngineCommand::Uci => "uci".to_string(),
            EngineCommand::IsReady => "isready".to_string(),
            EngineCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            EngineCommand::UciNewGame => "ucinewgame".to_string(),
            EngineCommand::Position { fen } => format!("position fen {}", fen),
            EngineCommand::Go(opts) => {
                let mut parts = vec!["go".to_string()];
                if let Some(d) = opts.depth {
                    parts.push(format!("depth {}", d));
                }
                if let Some(t) = opts.movetime {
                    parts.push(format!("movetime {}", t));
                }
                if let Some(n) = opts.nodes {
                    parts.push(format!("nodes {}", n));
                }
                parts.join(" ")
            }
            EngineCommand::Eval => "eval".to_string(),
            EngineCommand::Stop => "stop".to_string(),
            EngineCommand::Quit => "quit".to_string(),
        }
    }

    /// The line that ends this command's reply, or `None` for commands the
    /// engine answers silently.
    pub fn reply(&self) -> Option<ReplyTerminator> {
        match self {
            EngineCommand::Uci => Some(ReplyTerminator::UciOk),
            EngineCommand::IsReady => Some(ReplyTerminator::ReadyOk),
            EngineCommand::Go(_) => Some(ReplyTerminator::BestMove),
            EngineCommand::Eval => Some(ReplyTerminator::FinalEvaluation),
            EngineCommand::SetOption { .. }
            | EngineCommand::UciNewGame
            | EngineCommand::Position { .. }
            | EngineCommand::Stop
            | EngineCommand::Quit => None,
        }
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}
