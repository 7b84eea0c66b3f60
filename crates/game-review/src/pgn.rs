//! PGN parsing and replay into a [`GameRecord`].

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use chess_analysis::{GameOutcome, GameRecord, PlayerInfo, Side};
use regex::Regex;
use thiserror::Error;

/// Errors that can occur while reading or replaying a PGN.
#[derive(Error, Debug)]
pub enum PgnError {
    /// The text contains no game.
    #[error("No game found in PGN")]
    Empty,
    /// The `FEN` tag could not be read.
    #[error("Invalid FEN tag '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
    /// A move is not legal in the position it was played from.
    #[error("Illegal move {san} at ply {ply}")]
    IllegalMove { ply: usize, san: String },
    /// A parsing pattern failed to compile.
    #[error("PGN pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled patterns for one parse.
struct Patterns {
    tag: Regex,
    /// Brace comments, rest-of-line comments and NAGs.
    noise: Regex,
    move_number: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tag: Regex::new(r#"^\s*\[(\w+)\s+"((?:[^"\\]|\\.)*)"\s*\]"#)?,
            noise: Regex::new(r"\{[^}]*\}|;[^\n]*|\$\d+")?,
            move_number: Regex::new(r"^\d+\.+")?,
        })
    }
}

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// One game of a PGN file: its tag pairs and its mainline moves in SAN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    pub tags: Vec<(String, String)>,
    pub sans: Vec<String>,
}

impl PgnGame {
    /// Parse the first game in `text`.
    pub fn parse(text: &str) -> Result<Self, PgnError> {
        parse_all(text)?.into_iter().next().ok_or(PgnError::Empty)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Which side `username` played according to the `White`/`Black` tags.
    pub fn side_of(&self, username: &str) -> Option<Side> {
        if self.tag("White").is_some_and(|w| w.eq_ignore_ascii_case(username)) {
            Some(Side::White)
        } else if self.tag("Black").is_some_and(|b| b.eq_ignore_ascii_case(username)) {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// Name and rating from the `White`/`WhiteElo` (or `Black`/`BlackElo`) tags.
    pub fn player(&self, side: Side) -> PlayerInfo {
        let (name, elo) = match side {
            Side::White => ("White", "WhiteElo"),
            Side::Black => ("Black", "BlackElo"),
        };
        PlayerInfo::new(
            self.tag(name).unwrap_or("?"),
            self.tag(elo).and_then(|r| r.parse().ok()),
        )
    }

    /// Replay the moves, recording every position and the moves between them.
    ///
    /// The outcome is read from the final board when it is checkmate or
    /// stalemate, and from the `Result` tag otherwise.
    pub fn replay(&self, human: Side) -> Result<GameRecord, PgnError> {
        let (mut board, mut halfmove, mut fullmove) = match self.tag("FEN") {
            Some(fen) => start_from_fen(fen)?,
            None => (Board::default(), 0, 1),
        };

        let mut positions = vec![fen_with_counters(&board, halfmove, fullmove)];
        let mut moves = Vec::with_capacity(self.sans.len());

        for (ply, san) in self.sans.iter().enumerate() {
            let mv = resolve_san(&board, san).ok_or_else(|| PgnError::IllegalMove {
                ply,
                san: san.clone(),
            })?;

            let resets_clock = board.piece_on(mv.get_source()) == Some(Piece::Pawn)
                || board.piece_on(mv.get_dest()).is_some();
            halfmove = if resets_clock { 0 } else { halfmove + 1 };
            if board.side_to_move() == Color::Black {
                fullmove += 1;
            }

            board = board.make_move_new(mv);
            moves.push(mv.to_string());
            positions.push(fen_with_counters(&board, halfmove, fullmove));
        }

        let outcome = match board.status() {
            BoardStatus::Checkmate => Some(GameOutcome::Checkmate {
                winner: side_of_color(!board.side_to_move()),
            }),
            BoardStatus::Stalemate => Some(GameOutcome::Stalemate),
            BoardStatus::Ongoing => self.tag("Result").and_then(outcome_from_result),
        };

        Ok(GameRecord {
            positions,
            moves,
            human,
            outcome,
            white: self.player(Side::White),
            black: self.player(Side::Black),
        })
    }
}

/// Parse every game in `text`.
pub fn parse_all(text: &str) -> Result<Vec<PgnGame>, PgnError> {
    let patterns = Patterns::new()?;
    let mut games = Vec::new();
    let mut current = PgnGame::default();
    let mut movetext = String::new();

    for line in text.lines() {
        if let Some(caps) = patterns.tag.captures(line) {
            if !movetext.trim().is_empty() || !current.sans.is_empty() {
                current.sans = parse_movetext(&patterns, &movetext);
                games.push(std::mem::take(&mut current));
                movetext.clear();
            }
            current
                .tags
                .push((caps[1].to_string(), caps[2].replace("\\\"", "\"")));
        } else {
            movetext.push_str(line);
            movetext.push('\n');
        }
    }

    current.sans = parse_movetext(&patterns, &movetext);
    if !current.tags.is_empty() || !current.sans.is_empty() {
        games.push(current);
    }
    if games.is_empty() {
        return Err(PgnError::Empty);
    }
    Ok(games)
}

/// Extract the mainline SAN tokens from movetext.
fn parse_movetext(patterns: &Patterns, movetext: &str) -> Vec<String> {
    let without_noise = patterns.noise.replace_all(movetext, " ");
    let mainline = strip_variations(&without_noise);

    mainline
        .split_whitespace()
        .map(|token| patterns.move_number.replace(token, ""))
        .filter(|token| !token.is_empty() && &**token != "e.p." && !RESULTS.contains(&&**token))
        .map(|token| token.into_owned())
        .collect()
}

/// Find the one legal move of `board` that `san` describes.
///
/// Accepts promotions with or without `=` (`a8=Q`, `a8Q`), en passant
/// written as a plain capture (`exd6`) or with an `e.p.` suffix, castling
/// with letters or digits, and check or annotation suffixes. Returns `None`
/// for an illegal or ambiguous move.
fn resolve_san(board: &Board, san: &str) -> Option<ChessMove> {
    let san = san.trim_end_matches(['+', '#', '!', '?']);
    let san = san.strip_suffix("e.p.").unwrap_or(san).trim_end();

    if let Some(dest_file) = castling_file(san) {
        return MoveGen::new_legal(board).find(|mv| {
            board.piece_on(mv.get_source()) == Some(Piece::King)
                && mv.get_source().get_file().to_index() == 4
                && mv.get_dest().get_file().to_index() == dest_file
        });
    }

    let (body, promotion) = match san.split_once('=') {
        Some((body, piece)) => (body, Some(promotion_piece(piece)?)),
        None => match san.chars().last().and_then(|c| promotion_piece(&c.to_string())) {
            Some(piece) => (&san[..san.len() - 1], Some(piece)),
            None => (san, None),
        },
    };

    let mut chars: Vec<char> = body.chars().filter(|c| !matches!(c, 'x' | ':' | '-')).collect();
    let piece = match *chars.first()? {
        'K' => Piece::King,
        'Q' => Piece::Queen,
        'R' => Piece::Rook,
        'B' => Piece::Bishop,
        'N' => Piece::Knight,
        _ => Piece::Pawn,
    };
    if piece != Piece::Pawn {
        chars.remove(0);
    }
    if chars.len() < 2 {
        return None;
    }
    let dest: String = chars.split_off(chars.len() - 2).into_iter().collect();
    let dest = Square::from_str(&dest).ok()?;
    let from_file = chars
        .iter()
        .find(|c| ('a'..='h').contains(*c))
        .map(|&c| c as usize - 'a' as usize);
    let from_rank = chars
        .iter()
        .find(|c| ('1'..='8').contains(*c))
        .map(|&c| c as usize - '1' as usize);

    let mut candidates = MoveGen::new_legal(board).filter(|mv| {
        let source = mv.get_source();
        mv.get_dest() == dest
            && mv.get_promotion() == promotion
            && board.piece_on(source) == Some(piece)
            && from_file.map_or(true, |f| source.get_file().to_index() == f)
            && from_rank.map_or(true, |r| source.get_rank().to_index() == r)
    });
    let mv = candidates.next()?;
    candidates.next().is_none().then_some(mv)
}

/// Destination file of the king for `O-O` (g) or `O-O-O` (c).
fn castling_file(san: &str) -> Option<usize> {
    match san {
        "O-O" | "0-0" => Some(6),
        "O-O-O" | "0-0-0" => Some(2),
        _ => None,
    }
}

fn promotion_piece(letter: &str) -> Option<Piece> {
    match letter {
        "Q" | "q" => Some(Piece::Queen),
        "R" | "r" => Some(Piece::Rook),
        "B" => Some(Piece::Bishop),
        "N" | "n" => Some(Piece::Knight),
        _ => None,
    }
}

/// Remove `( ... )` variations, which may nest.
fn strip_variations(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn start_from_fen(fen: &str) -> Result<(Board, u32, u32), PgnError> {
    let board = Board::from_str(fen).map_err(|e| PgnError::InvalidFen {
        fen: fen.to_string(),
        reason: format!("{:?}", e),
    })?;
    let mut counters = fen.split_whitespace().skip(4);
    let halfmove = counters.next().and_then(|n| n.parse().ok()).unwrap_or(0);
    let fullmove = counters.next().and_then(|n| n.parse().ok()).unwrap_or(1);
    Ok((board, halfmove, fullmove))
}

/// FEN of `board` with real move counters in place of the board's own.
///
/// The board's en passant field names the pawn that just advanced two
/// squares; FEN wants the square behind it.
fn fen_with_counters(board: &Board, halfmove: u32, fullmove: u32) -> String {
    let fen = board.to_string();
    let fields: Vec<&str> = fen.split_whitespace().take(3).collect();
    let en_passant = board
        .en_passant()
        .and_then(|pawn| match board.side_to_move() {
            Color::White => pawn.up(),
            Color::Black => pawn.down(),
        })
        .map_or_else(|| "-".to_string(), |target| target.to_string());
    format!("{} {} {} {}", fields.join(" "), en_passant, halfmove, fullmove)
}

fn side_of_color(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn outcome_from_result(result: &str) -> Option<GameOutcome> {
    match result {
        "1-0" => Some(GameOutcome::Decided {
            winner: Side::White,
        }),
        "0-1" => Some(GameOutcome::Decided {
            winner: Side::Black,
        }),
        "1/2-1/2" => Some(GameOutcome::Draw),
        _ => None,
    }
}
