//! Whole-game analysis.
//!
//! This module provides the [`AnalysisPipeline`], which evaluates every
//! position of a [`GameRecord`] with one engine session and then flags the
//! reviewed player's mistakes.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uci::{EngineCommand, GoOptions, ParseError};

use crate::cancel::CancelSignal;
use crate::engine::EngineConfig;
use crate::evaluation::{EvaluationResult, PositionEvaluation, Unavailable};
use crate::game::{GameRecord, Side};
use crate::quality::{detect_mistakes, AnalysisReport};
use crate::session::{ProtocolSession, SessionError};

/// Errors that end a game analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The engine session failed in a way it cannot recover from.
    #[error("Engine error: {0}")]
    Session(#[from] SessionError),
    /// Invalid game data was provided.
    #[error("Invalid game data: {0}")]
    InvalidGame(String),
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Session(SessionError::Cancelled))
    }
}

/// How positions are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    /// `go depth <n>`: a search, which also yields a recommended move.
    #[default]
    Search,
    /// `eval`: Stockfish's static evaluation. Fast, but gives no move, so
    /// no mistakes can be flagged.
    Static,
}

/// Configuration for game analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Evaluation method.
    #[serde(default)]
    pub mode: EvalMode,
    /// Maximum search depth for position analysis.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Evaluation drop, in centipawns, a move must exceed to be flagged.
    #[serde(default = "default_threshold_cp")]
    pub threshold_cp: i32,
}

fn default_depth() -> u32 {
    15
}

fn default_threshold_cp() -> i32 {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: EvalMode::default(),
            depth: default_depth(),
            threshold_cp: default_threshold_cp(),
        }
    }
}

/// Reviews games with a UCI engine.
///
/// Each call to [`AnalysisPipeline::analyze`] starts a fresh engine, so a
/// crash or desynchronization in one game cannot leak into the next.
pub struct AnalysisPipeline {
    engine: EngineConfig,
    config: AnalysisConfig,
    cancel: CancelSignal,
}

impl AnalysisPipeline {
    /// Creates a new pipeline with the specified engine and configuration.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use chess_analysis::{AnalysisConfig, AnalysisPipeline, EngineConfig};
    ///
    /// let pipeline = AnalysisPipeline::new(EngineConfig::default(), AnalysisConfig::default());
    /// ```
    pub fn new(engine: EngineConfig, config: AnalysisConfig) -> Self {
        Self {
            engine,
            config,
            cancel: CancelSignal::never(),
        }
    }

    /// Abort analysis when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Analyzes a complete game.
    ///
    /// For each position, in order:
    /// 1. If it is the final position and the game ended there (checkmate,
    ///    stalemate or draw), records the outcome without asking the engine.
    /// 2. Otherwise sends the position and waits for the evaluation.
    /// 3. A timeout or an unparseable reply marks that position unavailable
    ///    and analysis continues.
    ///
    /// Mistake detection runs once all positions are evaluated.
    ///
    /// # Errors
    ///
    /// - `AnalysisError::InvalidGame` if positions and moves do not line up
    /// - `AnalysisError::Session` if the engine cannot be started, dies,
    ///   desynchronizes, or the analysis is cancelled
    pub async fn analyze(&self, game: &GameRecord) -> Result<AnalysisReport, AnalysisError> {
        game.validate().map_err(AnalysisError::InvalidGame)?;

        let mut session = ProtocolSession::start(&self.engine, self.cancel.clone()).await?;
        let result = self.run(&mut session, game).await;
        session.close().await;
        result
    }

    async fn run(
        &self,
        session: &mut ProtocolSession,
        game: &GameRecord,
    ) -> Result<AnalysisReport, AnalysisError> {
        self.configure(session).await?;

        let total = game.positions.len();
        let terminal = game.outcome.filter(|o| o.is_terminal_position());
        let mut evaluations = Vec::with_capacity(total);

        info!(
            positions = total,
            engine = session.engine_name(),
            mode = ?self.config.mode,
            "Analyzing game"
        );

        for (index, fen) in game.positions.iter().enumerate() {
            if index + 1 == total {
                if let Some(outcome) = terminal {
                    debug!(index, %outcome, "Final position is terminal");
                    evaluations.push(PositionEvaluation::Terminal(outcome));
                    continue;
                }
            }

            let evaluation = match self.evaluate(session, fen).await {
                Ok(eval) => PositionEvaluation::Evaluated(eval),
                Err(PositionFailure::Parse(ParseError::MalformedReply(reason))) => {
                    warn!(index, fen = %fen, %reason, "Unusable engine reply");
                    PositionEvaluation::Unavailable(Unavailable::Malformed(reason))
                }
                Err(PositionFailure::Session(SessionError::Timeout(after))) => {
                    warn!(index, fen = %fen, ?after, "Position timed out");
                    PositionEvaluation::Unavailable(Unavailable::Timeout)
                }
                Err(PositionFailure::Session(e)) => {
                    if !matches!(e, SessionError::Cancelled) {
                        error!(index, error = %e, "Engine session failed");
                    }
                    return Err(e.into());
                }
            };
            debug!(index, total, "Position evaluated");
            evaluations.push(evaluation);
        }

        let mistakes = detect_mistakes(game, &evaluations, self.config.threshold_cp);
        let report = AnalysisReport::new(session.engine_name(), evaluations, mistakes);
        info!(
            mistakes = report.mistakes.len(),
            timeouts = report.timeouts,
            malformed = report.malformed,
            "Analysis complete"
        );
        Ok(report)
    }

    async fn configure(&self, session: &mut ProtocolSession) -> Result<(), SessionError> {
        session
            .send(&EngineCommand::set_option("Threads", self.engine.threads))
            .await?;
        if let Some(hash) = self.engine.hash_mb {
            session
                .send(&EngineCommand::set_option("Hash", hash))
                .await?;
        }
        session.send(&EngineCommand::UciNewGame).await?;
        session.request(&EngineCommand::IsReady).await?;
        Ok(())
    }

    async fn evaluate(
        &self,
        session: &mut ProtocolSession,
        fen: &str,
    ) -> Result<EvaluationResult, PositionFailure> {
        session
            .send(&EngineCommand::Position {
                fen: fen.to_string(),
            })
            .await?;
        let command = match self.config.mode {
            EvalMode::Search => EngineCommand::Go(GoOptions::depth(self.config.depth)),
            EvalMode::Static => EngineCommand::Eval,
        };
        let reply = session.request(&command).await?;
        let eval = uci::parse_evaluation(&reply)?;
        let white_to_move = Side::to_move_in(fen) == Some(Side::White);
        Ok(eval.relative_to_side_to_move(white_to_move))
    }
}

/// Why a single position could not be evaluated.
enum PositionFailure {
    Session(SessionError),
    Parse(ParseError),
}

impl From<SessionError> for PositionFailure {
    fn from(e: SessionError) -> Self {
        PositionFailure::Session(e)
    }
}

impl From<ParseError> for PositionFailure {
    fn from(e: ParseError) -> Self {
        PositionFailure::Parse(e)
    }
}
