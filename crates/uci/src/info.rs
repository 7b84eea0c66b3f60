//! UCI info line parsing.

use serde::{Deserialize, Serialize};

/// Centipawn value used in place of a forced mate when scores are compared.
pub const MATE_VALUE: i32 = 10_000;

/// Longest mate distance kept from an engine report.
const MAX_MATE_DISTANCE: i32 = 999;

/// Largest centipawn magnitude kept, just below the slowest mate.
const MAX_CENTIPAWNS: i32 = MATE_VALUE - MAX_MATE_DISTANCE - 1;

/// Score in centipawns or mate distance, from the side to move's perspective
/// unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Hundredths of a pawn.
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = side to move
    /// gets mated, 0 = side to move is already mated).
    Mate(i32),
}

impl Score {
    /// Collapse the score onto the centipawn scale.
    ///
    /// Mates map to `±MATE_VALUE` minus the distance so that a faster mate
    /// is always worth more than a slower one.
    pub fn to_centipawns(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n > 0 => MATE_VALUE.saturating_sub(n),
            Score::Mate(n) => (-MATE_VALUE).saturating_sub(n),
        }
    }

    /// The same score seen by the other side.
    pub fn flip(self) -> Self {
        match self {
            Score::Cp(cp) => Score::Cp(cp.saturating_neg()),
            Score::Mate(n) => Score::Mate(n.saturating_neg()),
        }
    }

    /// Clamp an engine-reported score into the range a sane engine uses,
    /// keeping every centipawn score below every mate.
    pub fn bounded(self) -> Self {
        match self {
            Score::Cp(cp) => Score::Cp(cp.clamp(-MAX_CENTIPAWNS, MAX_CENTIPAWNS)),
            Score::Mate(n) => Score::Mate(n.clamp(-MAX_MATE_DISTANCE, MAX_MATE_DISTANCE)),
        }
    }
}

/// Whether a reported score is exact or only a search-window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreBound {
    #[default]
    Exact,
    Lower,
    Upper,
}

/// The fields of one `info` line that matter for scoring a position.
///
/// Everything else the engine reports (`nps`, `time`, `hashfull`,
/// `currmove`, ...) is skipped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    /// Index of this line when the engine reports several (1-based).
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    /// Whether `score` is exact.
    pub bound: ScoreBound,
    pub nodes: Option<u64>,
    /// Principal variation, in coordinate notation.
    pub pv: Vec<String>,
    /// Free text after `string`.
    pub string: Option<String>,
}

impl EngineInfo {
    /// Returns true for the primary line of a multi-PV search (or any line of
    /// a single-PV search).
    pub fn is_primary(&self) -> bool {
        self.multipv.map_or(true, |n| n == 1)
    }

    /// Parse an `info` line. Returns `None` for any other line.
    ///
    /// Unknown or unparsable values are ignored rather than rejected, since
    /// engines routinely add their own fields.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some("info") {
            return None;
        }

        let mut info = Self::default();
        while let Some(token) = tokens.next() {
            match token {
                "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
                "seldepth" => info.seldepth = tokens.next().and_then(|v| v.parse().ok()),
                "multipv" => info.multipv = tokens.next().and_then(|v| v.parse().ok()),
                "nodes" => info.nodes = tokens.next().and_then(|v| v.parse().ok()),
                "score" => {
                    let kind = tokens.next();
                    let value = tokens.next().and_then(|v| v.parse().ok());
                    info.score = match (kind, value) {
                        (Some("cp"), Some(cp)) => Some(Score::Cp(cp).bounded()),
                        (Some("mate"), Some(n)) => Some(Score::Mate(n).bounded()),
                        _ => info.score,
                    };
                }
                "lowerbound" => info.bound = ScoreBound::Lower,
                "upperbound" => info.bound = ScoreBound::Upper,
                "pv" => {
                    while let Some(mv) = tokens.next_if(|t| !is_keyword(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "refutation" | "currline" => {
                    while tokens.next_if(|t| !is_keyword(t)).is_some() {}
                }
                "string" => {
                    info.string = Some(tokens.by_ref().collect::<Vec<_>>().join(" "));
                }
                t if takes_one_value(t) => {
                    tokens.next();
                }
                _ => {}
            }
        }

        Some(info)
    }
}

/// Keywords followed by exactly one value that are not kept.
fn takes_one_value(token: &str) -> bool {
    matches!(
        token,
        "time" | "nps" | "hashfull" | "tbhits" | "sbhits" | "cpuload" | "currmove" | "currmovenumber"
    )
}

fn is_keyword(token: &str) -> bool {
    takes_one_value(token)
        || matches!(
            token,
            "depth"
                | "seldepth"
                | "multipv"
                | "nodes"
                | "score"
                | "lowerbound"
                | "upperbound"
                | "pv"
                | "refutation"
                | "currline"
                | "string"
        )
}
