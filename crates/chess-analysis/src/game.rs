//! The game being reviewed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Side to move according to the second field of a FEN string.
    pub fn to_move_in(fen: &str) -> Option<Self> {
        match fen.split_whitespace().nth(1)? {
            "w" => Some(Side::White),
            "b" => Some(Side::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// The final position is checkmate.
    Checkmate { winner: Side },
    /// The final position is stalemate.
    Stalemate,
    /// The final position is drawn (insufficient material, repetition, ...).
    Draw,
    /// Decided off the board: resignation, timeout or abandonment.
    Decided { winner: Side },
}

impl GameOutcome {
    /// Returns true if the final position itself ends the game, so there
    /// is nothing for an engine to search.
    pub fn is_terminal_position(self) -> bool {
        !matches!(self, GameOutcome::Decided { .. })
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Checkmate { winner } => write!(f, "{} wins by checkmate", winner),
            GameOutcome::Stalemate => write!(f, "Draw by stalemate"),
            GameOutcome::Draw => write!(f, "Draw"),
            GameOutcome::Decided { winner } => write!(f, "{} wins", winner),
        }
    }
}

/// A player's display details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub rating: Option<u32>,
}

impl PlayerInfo {
    pub fn new(name: impl Into<String>, rating: Option<u32>) -> Self {
        Self {
            name: name.into(),
            rating,
        }
    }
}

impl fmt::Display for PlayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rating {
            Some(rating) => write!(f, "{} ({})", self.name, rating),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A replayed game: every position it passed through and the moves between
/// them.
///
/// `positions[0]` is the starting position and `positions[i + 1]` is the
/// position after `moves[i]`. Moves are in coordinate notation (`e2e4`,
/// `e7e8q`), the same notation the engine recommends moves in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Positions as FEN strings.
    pub positions: Vec<String>,
    pub moves: Vec<String>,
    /// The side whose moves are reviewed.
    pub human: Side,
    pub outcome: Option<GameOutcome>,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
}

impl GameRecord {
    /// Check the record's shape before any engine work is done.
    pub fn validate(&self) -> Result<(), String> {
        if self.positions.is_empty() {
            return Err("game has no positions".to_string());
        }
        if self.moves.len() + 1 != self.positions.len() {
            return Err(format!(
                "{} moves do not connect {} positions",
                self.moves.len(),
                self.positions.len()
            ));
        }
        if let Some((index, fen)) = self
            .positions
            .iter()
            .enumerate()
            .find(|(_, fen)| Side::to_move_in(fen).is_none())
        {
            return Err(format!("position {} is not a valid FEN: '{}'", index, fen));
        }
        Ok(())
    }

    /// Side to move in position `index`.
    pub fn side_to_move(&self, index: usize) -> Option<Side> {
        self.positions.get(index).and_then(|fen| Side::to_move_in(fen))
    }

    /// Full-move number of position `index` (the FEN's sixth field).
    pub fn move_number(&self, index: usize) -> Option<u32> {
        self.positions
            .get(index)?
            .split_whitespace()
            .nth(5)?
            .parse()
            .ok()
    }

    /// Details of the reviewed player.
    pub fn human_player(&self) -> &PlayerInfo {
        match self.human {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}
