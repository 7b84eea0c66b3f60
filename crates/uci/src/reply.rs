//! Extraction of evaluations from complete engine replies.

use serde::Serialize;

use crate::info::{EngineInfo, Score, ScoreBound};
use crate::ParseError;

const FINAL_EVALUATION: &str = "Final evaluation";

/// Whose point of view a score is expressed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Perspective {
    /// Positive favours the side to move (search `info` lines).
    SideToMove,
    /// Positive favours White (Stockfish's `eval` trace).
    White,
}

/// Structured facts taken from one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// The position's score.
    pub score: Score,
    /// The engine's preferred move in coordinate notation, if it gave one.
    pub best_move: Option<String>,
    /// Depth reached by the search; absent for static evaluations.
    pub depth: Option<u32>,
    /// Point of view of `score`.
    pub perspective: Perspective,
}

impl Evaluation {
    /// Re-express the score from the side to move's point of view.
    pub fn relative_to_side_to_move(self, white_to_move: bool) -> Self {
        match self.perspective {
            Perspective::SideToMove => self,
            Perspective::White => Self {
                score: if white_to_move {
                    self.score
                } else {
                    self.score.flip()
                },
                perspective: Perspective::SideToMove,
                ..self
            },
        }
    }
}

/// Parse a reply into an [`Evaluation`].
///
/// The score comes from the last `info` line carrying `score cp` or
/// `score mate` (exact scores win over bounds, secondary multi-PV lines are
/// ignored) or from a `Final evaluation` line, whichever appears last. The
/// best move comes from the last `bestmove` line.
///
/// # Errors
///
/// Returns [`ParseError::MalformedReply`] if the reply holds no score. A
/// score of zero is a valid score.
pub fn parse_evaluation(text: &str) -> Result<Evaluation, ParseError> {
    let mut exact: Option<(Score, Option<u32>, Perspective)> = None;
    let mut bounded: Option<(Score, Option<u32>)> = None;
    let mut best_move = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(info) = EngineInfo::parse(line) {
            let Some(score) = info.score else { continue };
            if !info.is_primary() {
                continue;
            }
            match info.bound {
                ScoreBound::Exact => exact = Some((score, info.depth, Perspective::SideToMove)),
                ScoreBound::Lower | ScoreBound::Upper => bounded = Some((score, info.depth)),
            }
        } else if let Some(mv) = bestmove_token(line) {
            best_move = mv;
        } else if let Some(rest) = line.strip_prefix(FINAL_EVALUATION) {
            if let Some(score) = parse_final_evaluation(rest) {
                let perspective = if rest.contains("(white side)") {
                    Perspective::White
                } else {
                    Perspective::SideToMove
                };
                exact = Some((score, None, perspective));
            }
        }
    }

    let (score, depth, perspective) = exact
        .or_else(|| bounded.map(|(s, d)| (s, d, Perspective::SideToMove)))
        .ok_or_else(|| ParseError::MalformedReply("no score in reply".to_string()))?;

    Ok(Evaluation {
        score,
        best_move,
        depth,
        perspective,
    })
}

/// Parse just the suggested move from a `go` reply.
///
/// # Errors
///
/// Returns [`ParseError::MalformedReply`] if there is no `bestmove` line or
/// the engine had no move to suggest (`bestmove (none)`).
pub fn parse_best_move(text: &str) -> Result<String, ParseError> {
    text.lines()
        .filter_map(|line| bestmove_token(line.trim()))
        .last()
        .flatten()
        .ok_or_else(|| ParseError::MalformedReply("no best move in reply".to_string()))
}

/// Extract the engine's name from a `uci` reply.
pub fn parse_engine_name(text: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("id name "))
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// `Some(Some(mv))` for a `bestmove` line with a move, `Some(None)` for a
/// `bestmove` line without one, `None` for any other line.
fn bestmove_token(line: &str) -> Option<Option<String>> {
    let mut parts = line.split_whitespace();
    if parts.next() != Some("bestmove") {
        return None;
    }
    Some(
        parts
            .next()
            .filter(|mv| *mv != "(none)" && *mv != "0000")
            .map(str::to_string),
    )
}

/// Parse the remainder of a `Final evaluation` line, given in pawns.
fn parse_final_evaluation(rest: &str) -> Option<Score> {
    let token = rest.trim_start_matches(':').split_whitespace().next()?;
    let pawns: f64 = token.parse().ok()?;
    if !pawns.is_finite() {
        return None;
    }
    Some(Score::Cp((pawns * 100.0).round() as i32).bounded())
}
