//! Move quality classification and the review report.

use std::fmt;

use serde::Serialize;

use crate::evaluation::{PositionEvaluation, Unavailable};
use crate::game::{GameRecord, Side};

/// Classification of a flagged move by how much evaluation it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MoveQuality {
    /// Noticeable loss (under one pawn)
    Inaccuracy,
    /// Significant loss (one to three pawns)
    Mistake,
    /// Major loss (three pawns or more)
    Blunder,
}

impl MoveQuality {
    /// Classify an evaluation drop in centipawns.
    pub fn from_eval_drop(drop: i32) -> Self {
        match drop {
            d if d >= 300 => MoveQuality::Blunder,
            d if d >= 100 => MoveQuality::Mistake,
            _ => MoveQuality::Inaccuracy,
        }
    }

    /// Annotation symbol used in move lists.
    pub fn symbol(self) -> &'static str {
        match self {
            MoveQuality::Inaccuracy => "?!",
            MoveQuality::Mistake => "?",
            MoveQuality::Blunder => "??",
        }
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveQuality::Inaccuracy => write!(f, "Inaccuracy"),
            MoveQuality::Mistake => write!(f, "Mistake"),
            MoveQuality::Blunder => write!(f, "Blunder"),
        }
    }
}

/// A move of the reviewed player that lost too much against the engine's
/// recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedMistake {
    /// Index into the game's moves.
    pub move_index: usize,
    /// Full-move number as shown in a move list.
    pub move_number: u32,
    pub side: Side,
    pub played_move: String,
    pub recommended_move: String,
    /// Centipawns for the mover before the move.
    pub eval_before: i32,
    /// Centipawns for the mover after the move.
    pub eval_after: i32,
    /// `eval_before - eval_after`
    pub eval_drop: i32,
    pub quality: MoveQuality,
}

/// Result of reviewing one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub engine: String,
    /// One entry per position of the game, in order.
    pub evaluations: Vec<PositionEvaluation>,
    pub mistakes: Vec<FlaggedMistake>,
    /// Positions the engine did not answer in time.
    pub timeouts: usize,
    /// Positions the engine answered without a usable score.
    pub malformed: usize,
}

impl AnalysisReport {
    /// Build a report, counting unavailable positions.
    pub fn new(
        engine: impl Into<String>,
        evaluations: Vec<PositionEvaluation>,
        mistakes: Vec<FlaggedMistake>,
    ) -> Self {
        let timeouts = evaluations
            .iter()
            .filter(|e| matches!(e, PositionEvaluation::Unavailable(Unavailable::Timeout)))
            .count();
        let malformed = evaluations
            .iter()
            .filter(|e| matches!(e, PositionEvaluation::Unavailable(Unavailable::Malformed(_))))
            .count();
        Self {
            engine: engine.into(),
            evaluations,
            mistakes,
            timeouts,
            malformed,
        }
    }

    /// Returns true if every position was evaluated or terminal.
    pub fn is_complete(&self) -> bool {
        self.timeouts == 0 && self.malformed == 0
    }

    pub fn count(&self, quality: MoveQuality) -> usize {
        self.mistakes.iter().filter(|m| m.quality == quality).count()
    }
}

/// Normalize a move for comparison: trimmed, lowercase, without check or
/// mate suffixes.
pub fn normalize_move(mv: &str) -> String {
    mv.trim()
        .trim_end_matches(['+', '#'])
        .to_ascii_lowercase()
}

/// Find the reviewed player's moves that lost more than `threshold_cp`
/// centipawns compared with the engine's evaluation of the position before
/// them.
///
/// `evaluations[i]` must describe `game.positions[i]`. A move is skipped when
/// it matches the engine's recommendation, when the engine gave no
/// recommendation, or when either surrounding position lacks a score.
pub fn detect_mistakes(
    game: &GameRecord,
    evaluations: &[PositionEvaluation],
    threshold_cp: i32,
) -> Vec<FlaggedMistake> {
    let mut mistakes = Vec::new();

    for (index, played) in game.moves.iter().enumerate() {
        let Some(mover) = game.side_to_move(index) else {
            continue;
        };
        if mover != game.human {
            continue;
        }
        let Some(PositionEvaluation::Evaluated(before)) = evaluations.get(index) else {
            continue;
        };
        let Some(recommended) = before.best_move.as_deref() else {
            continue;
        };
        if normalize_move(played) == normalize_move(recommended) {
            continue;
        }
        let Some(eval_after) = evaluations
            .get(index + 1)
            .and_then(PositionEvaluation::centipawns_for_mover)
        else {
            continue;
        };

        let eval_before = before.score.to_centipawns();
        let eval_drop = eval_before.saturating_sub(eval_after);
        if eval_drop > threshold_cp {
            mistakes.push(FlaggedMistake {
                move_index: index,
                move_number: game.move_number(index).unwrap_or(index as u32 / 2 + 1),
                side: mover,
                played_move: played.clone(),
                recommended_move: recommended.to_string(),
                eval_before,
                eval_after,
                eval_drop,
                quality: MoveQuality::from_eval_drop(eval_drop),
            });
        }
    }

    mistakes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tests::opening;
    use crate::game::GameOutcome;
    use uci::{Evaluation, Perspective, Score, MATE_VALUE};

    fn eval(score: Score, best: Option<&str>) -> PositionEvaluation {
        PositionEvaluation::Evaluated(Evaluation {
            score,
            best_move: best.map(str::to_string),
            depth: Some(15),
            perspective: Perspective::SideToMove,
        })
    }

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(MoveQuality::from_eval_drop(101), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_eval_drop(99), MoveQuality::Inaccuracy);
        assert_eq!(MoveQuality::from_eval_drop(100), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_eval_drop(299), MoveQuality::Mistake);
        assert_eq!(MoveQuality::from_eval_drop(300), MoveQuality::Blunder);
        assert_eq!(MoveQuality::Blunder.symbol(), "??");
        assert!(MoveQuality::Blunder > MoveQuality::Inaccuracy);
    }

    #[test]
    fn test_normalize_move() {
        assert_eq!(normalize_move(" E7E8Q+ "), "e7e8q");
        assert_eq!(normalize_move("d1h5#"), "d1h5");
        assert_eq!(normalize_move("g1f3"), "g1f3");
    }

    #[test]
    fn test_drop_past_threshold_is_flagged() {
        // White is +50 before e2e4; after it Black is +80, i.e. White is -80.
        let game = opening(Side::White);
        let evaluations = vec![
            eval(Score::Cp(50), Some("d2d4")),
            eval(Score::Cp(80), Some("e7e5")),
            eval(Score::Cp(10), Some("g1f3")),
        ];

        let mistakes = detect_mistakes(&game, &evaluations, 100);
        assert_eq!(mistakes.len(), 1);
        let m = &mistakes[0];
        assert_eq!(m.move_index, 0);
        assert_eq!(m.move_number, 1);
        assert_eq!(m.side, Side::White);
        assert_eq!(m.played_move, "e2e4");
        assert_eq!(m.recommended_move, "d2d4");
        assert_eq!(m.eval_before, 50);
        assert_eq!(m.eval_after, -80);
        assert_eq!(m.eval_drop, 130);
        assert_eq!(m.quality, MoveQuality::Mistake);

        assert!(detect_mistakes(&game, &evaluations, 200).is_empty());
    }

    #[test]
    fn test_drop_equal_to_threshold_is_not_flagged() {
        let game = opening(Side::White);
        let evaluations = vec![
            eval(Score::Cp(20), Some("d2d4")),
            eval(Score::Cp(80), None),
            eval(Score::Cp(0), None),
        ];
        assert!(detect_mistakes(&game, &evaluations, 100).is_empty());
        assert_eq!(detect_mistakes(&game, &evaluations, 99).len(), 1);
    }

    #[test]
    fn test_recommended_move_is_never_flagged() {
        let game = opening(Side::White);
        let evaluations = vec![
            eval(Score::Cp(50), Some("E2E4")),
            eval(Score::Cp(900), None),
            eval(Score::Cp(0), None),
        ];
        assert!(detect_mistakes(&game, &evaluations, 0).is_empty());
    }

    #[test]
    fn test_only_reviewed_side_is_flagged() {
        // Black's e7e5 loses 300 (from -50 to -350) but White is reviewed.
        let evaluations = vec![
            eval(Score::Cp(50), Some("e2e4")),
            eval(Score::Cp(-50), Some("c7c5")),
            eval(Score::Cp(350), None),
        ];
        assert!(detect_mistakes(&opening(Side::White), &evaluations, 100).is_empty());

        let mistakes = detect_mistakes(&opening(Side::Black), &evaluations, 100);
        assert_eq!(mistakes.len(), 1);
        assert_eq!(mistakes[0].move_index, 1);
        assert_eq!(mistakes[0].side, Side::Black);
        assert_eq!(mistakes[0].eval_drop, 300);
        assert_eq!(mistakes[0].quality, MoveQuality::Blunder);
    }

    #[test]
    fn test_unavailable_neighbours_are_skipped() {
        let game = opening(Side::White);
        let evaluations = vec![
            eval(Score::Cp(50), Some("d2d4")),
            PositionEvaluation::Unavailable(Unavailable::Timeout),
            eval(Score::Cp(0), None),
        ];
        assert!(detect_mistakes(&game, &evaluations, 0).is_empty());

        let evaluations = vec![
            PositionEvaluation::Unavailable(Unavailable::Malformed(String::new())),
            eval(Score::Cp(900), None),
            eval(Score::Cp(0), None),
        ];
        assert!(detect_mistakes(&game, &evaluations, 0).is_empty());
    }

    #[test]
    fn test_missed_mate_counts_as_large_drop() {
        let game = opening(Side::White);
        let evaluations = vec![
            eval(Score::Mate(2), Some("d1h5")),
            eval(Score::Cp(0), None),
            eval(Score::Cp(0), None),
        ];
        let mistakes = detect_mistakes(&game, &evaluations, 100);
        assert_eq!(mistakes[0].eval_drop, MATE_VALUE - 2);
        assert_eq!(mistakes[0].quality, MoveQuality::Blunder);
    }

    #[test]
    fn test_extreme_scores_saturate() {
        let game = opening(Side::White);
        let evaluations = vec![
            eval(Score::Cp(i32::MAX), Some("d2d4")),
            eval(Score::Cp(i32::MAX), None),
            eval(Score::Cp(0), None),
        ];
        let mistakes = detect_mistakes(&game, &evaluations, 100);
        assert_eq!(mistakes[0].eval_after, -i32::MAX);
        assert_eq!(mistakes[0].eval_drop, i32::MAX);
        assert_eq!(mistakes[0].quality, MoveQuality::Blunder);
    }

    #[test]
    fn test_terminal_position_after_move() {
        let mut game = opening(Side::Black);
        game.outcome = Some(GameOutcome::Stalemate);
        // Black was winning, then stalemated: level for the mover.
        let evaluations = vec![
            eval(Score::Cp(0), None),
            eval(Score::Cp(500), Some("d8h4")),
            PositionEvaluation::Terminal(GameOutcome::Stalemate),
        ];
        let mistakes = detect_mistakes(&game, &evaluations, 100);
        assert_eq!(mistakes.len(), 1);
        assert_eq!(mistakes[0].eval_after, 0);
        assert_eq!(mistakes[0].eval_drop, 500);
    }

    #[test]
    fn test_report_counts() {
        let report = AnalysisReport::new(
            "FakeFish",
            vec![
                eval(Score::Cp(0), None),
                PositionEvaluation::Unavailable(Unavailable::Timeout),
                PositionEvaluation::Unavailable(Unavailable::Malformed("x".into())),
                PositionEvaluation::Unavailable(Unavailable::Timeout),
            ],
            Vec::new(),
        );
        assert_eq!(report.timeouts, 2);
        assert_eq!(report.malformed, 1);
        assert!(!report.is_complete());
        assert_eq!(report.count(MoveQuality::Blunder), 0);
    }
}
