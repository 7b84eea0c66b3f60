//! Plain-text rendering of an analysis report.

use std::fmt::Write;

use chess_analysis::{
    AnalysisReport, FlaggedMistake, GameRecord, MoveQuality, PositionEvaluation, Side, Unavailable,
};
use uci::Score;

use crate::config::ReportStyle;

/// Render `report` for `game` as text.
pub fn render(game: &GameRecord, report: &AnalysisReport, style: &ReportStyle) -> String {
    let mut out = String::new();
    let half = style.width / 2;
    let rule = "-".repeat(style.width);

    let _ = writeln!(
        out,
        "{:<half$}{:>rest$}",
        format!("White: {}", game.white),
        format!("Black: {}", game.black),
        half = half,
        rest = style.width - half,
    );
    let _ = writeln!(
        out,
        "Reviewing {} ({}) with {}",
        game.human,
        game.human_player().name,
        report.engine
    );
    if let Some(outcome) = game.outcome {
        let _ = writeln!(out, "Result: {}", outcome);
    }
    let _ = writeln!(out, "{}", rule);

    if style.show_all_positions {
        for (index, evaluation) in report.evaluations.iter().enumerate() {
            let label = match index.checked_sub(1) {
                None => "start".to_string(),
                Some(ply) => {
                    let flag = report
                        .mistakes
                        .iter()
                        .find(|m| m.move_index == ply)
                        .map_or("", |m| m.quality.symbol());
                    format!("{}{}", move_label(game, ply), flag)
                }
            };
            let _ = writeln!(
                out,
                "{:<16}{}",
                label,
                describe(evaluation, game.side_to_move(index))
            );
        }
        let _ = writeln!(out, "{}", rule);
    }

    if report.mistakes.is_empty() {
        let _ = writeln!(
            out,
            "No moves by {} lost more than the threshold.",
            game.human_player().name
        );
    }
    for mistake in &report.mistakes {
        render_mistake(&mut out, game, mistake, style);
    }

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}", summary(report));
    out
}

fn render_mistake(out: &mut String, game: &GameRecord, mistake: &FlaggedMistake, style: &ReportStyle) {
    let _ = writeln!(
        out,
        "{}{} {}: played {}, engine preferred {} ({} pawns)",
        move_label(game, mistake.move_index),
        mistake.quality.symbol(),
        mistake.quality,
        mistake.played_move,
        mistake.recommended_move,
        format_pawns(-mistake.eval_drop),
    );
    if style.board_diagrams {
        if let Some(fen) = game.positions.get(mistake.move_index + 1) {
            let _ = writeln!(out, "    After {}:", mistake.played_move);
            for line in board_diagram(fen, game.human, style.unicode_pieces) {
                let _ = writeln!(out, "    {}", line);
            }
        }
        let _ = writeln!(out);
    }
}

fn summary(report: &AnalysisReport) -> String {
    let mut summary = format!(
        "{} inaccuracies, {} mistakes, {} blunders",
        report.count(MoveQuality::Inaccuracy),
        report.count(MoveQuality::Mistake),
        report.count(MoveQuality::Blunder),
    );
    if report.timeouts > 0 {
        let _ = write!(summary, "; {} positions timed out", report.timeouts);
    }
    if report.malformed > 0 {
        let _ = write!(summary, "; {} unreadable replies", report.malformed);
    }
    summary
}

/// `12. e2e4` for White's moves, `12... e7e5` for Black's.
fn move_label(game: &GameRecord, ply: usize) -> String {
    let number = game.move_number(ply).unwrap_or(ply as u32 / 2 + 1);
    let mv = game.moves.get(ply).map_or("?", String::as_str);
    match game.side_to_move(ply) {
        Some(Side::Black) => format!("{}... {}", number, mv),
        _ => format!("{}. {}", number, mv),
    }
}

/// One position's evaluation, shown from White's point of view.
fn describe(evaluation: &PositionEvaluation, to_move: Option<Side>) -> String {
    match evaluation {
        PositionEvaluation::Evaluated(eval) => {
            let score = match to_move {
                Some(Side::Black) => eval.score.flip(),
                _ => eval.score,
            };
            match &eval.best_move {
                Some(best) => format!("{:<8} best {}", format_score(score), best),
                None => format_score(score),
            }
        }
        PositionEvaluation::Terminal(outcome) => outcome.to_string(),
        PositionEvaluation::Unavailable(Unavailable::Timeout) => "no reply (timeout)".to_string(),
        PositionEvaluation::Unavailable(Unavailable::Malformed(_)) => "unreadable reply".to_string(),
    }
}

fn format_score(score: Score) -> String {
    match score {
        Score::Cp(cp) => format_pawns(cp),
        Score::Mate(n) if n < 0 => format!("#-{}", -n),
        Score::Mate(n) => format!("#{}", n),
    }
}

fn format_pawns(cp: i32) -> String {
    format!("{:+.2}", f64::from(cp) / 100.0)
}

/// Draw the piece placement of `fen` with `orientation` at the bottom.
///
/// Returns no lines if the placement field is malformed.
pub fn board_diagram(fen: &str, orientation: Side, unicode: bool) -> Vec<String> {
    let Some(placement) = fen.split_whitespace().next() else {
        return Vec::new();
    };

    let mut ranks: Vec<Vec<char>> = Vec::with_capacity(8);
    for rank in placement.split('/') {
        let mut squares = Vec::with_capacity(8);
        for c in rank.chars() {
            match c.to_digit(10) {
                Some(n) => squares.extend(std::iter::repeat('.').take(n as usize)),
                None => squares.push(c),
            }
        }
        if squares.len() != 8 {
            return Vec::new();
        }
        ranks.push(squares);
    }
    if ranks.len() != 8 {
        return Vec::new();
    }

    let mut files: Vec<char> = ('a'..='h').collect();
    let mut rank_numbers: Vec<u32> = (1..=8).rev().collect();
    if orientation == Side::Black {
        ranks.reverse();
        ranks.iter_mut().for_each(|rank| rank.reverse());
        files.reverse();
        rank_numbers.reverse();
    }

    let mut lines: Vec<String> = ranks
        .iter()
        .zip(rank_numbers)
        .map(|(squares, number)| {
            let row: Vec<String> = squares
                .iter()
                .map(|&c| piece_symbol(c, unicode).to_string())
                .collect();
            format!("{} {}", number, row.join(" "))
        })
        .collect();
    let footer: Vec<String> = files.iter().map(char::to_string).collect();
    lines.push(format!("  {}", footer.join(" ")));
    lines
}

fn piece_symbol(c: char, unicode: bool) -> char {
    if !unicode {
        return c;
    }
    match c {
        'K' => '♔',
        'Q' => '♕',
        'R' => '♖',
        'B' => '♗',
        'N' => '♘',
        'P' => '♙',
        'k' => '♚',
        'q' => '♛',
        'r' => '♜',
        'b' => '♝',
        'n' => '♞',
        'p' => '♟',
        other => other,
    }
}
