//! Per-position evaluation results.

use serde::Serialize;
use uci::{Score, MATE_VALUE};

use crate::game::GameOutcome;

/// Engine verdict on one position, from the side to move's perspective.
pub type EvaluationResult = uci::Evaluation;

/// Why a position has no evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// The engine did not answer within the reply timeout.
    Timeout,
    /// The engine answered without a usable score.
    Malformed(String),
}

/// What is known about one position of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionEvaluation {
    Evaluated(EvaluationResult),
    /// The game ended in this position; the engine was not consulted.
    Terminal(GameOutcome),
    Unavailable(Unavailable),
}

impl PositionEvaluation {
    /// Score for the side to move in this position, if any.
    pub fn score(&self) -> Option<Score> {
        match self {
            PositionEvaluation::Evaluated(eval) => Some(eval.score),
            PositionEvaluation::Terminal(_) | PositionEvaluation::Unavailable(_) => None,
        }
    }

    /// Centipawn value of this position for the side that just moved into it.
    ///
    /// An engine score is negated (it is given for the side to move). A
    /// checkmate counts as a won position for the mover and a stalemate or
    /// draw as level.
    pub fn centipawns_for_mover(&self) -> Option<i32> {
        match self {
            PositionEvaluation::Evaluated(eval) => Some(eval.score.to_centipawns().saturating_neg()),
            PositionEvaluation::Terminal(GameOutcome::Checkmate { .. }) => Some(MATE_VALUE),
            PositionEvaluation::Terminal(GameOutcome::Stalemate | GameOutcome::Draw) => Some(0),
            PositionEvaluation::Terminal(GameOutcome::Decided { .. })
            | PositionEvaluation::Unavailable(_) => None,
        }
    }

    pub fn best_move(&self) -> Option<&str> {
        match self {
            PositionEvaluation::Evaluated(eval) => eval.best_move.as_deref(),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, PositionEvaluation::Unavailable(_))
    }
}
