//! Choosing the game to review and the side to review it for.

use chess_analysis::{GameRecord, Side};
use thiserror::Error;

use crate::archive::{ArchiveError, ArchivedGame, MonthlyArchive};
use crate::pgn::{self, PgnError, PgnGame};

#[derive(Error, Debug)]
pub enum SelectError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Pgn(#[from] PgnError),
    /// The chosen game has no PGN to replay.
    #[error("Game {0} has no PGN")]
    MissingPgn(String),
    /// The reviewed player did not play in the chosen game.
    #[error("{0} did not play in this game")]
    NotAPlayer(String),
}

/// Replay the most recent game of `archive` for `username`.
pub fn latest_from_archive(
    archive: &MonthlyArchive,
    username: &str,
) -> Result<GameRecord, SelectError> {
    let game = archive
        .latest_game()
        .ok_or_else(|| ArchiveError::NoGames(username.to_string()))?;
    from_archived(game, username)
}

/// Replay an archived game. Player names and ratings come from the
/// archive entry rather than the PGN tags.
pub fn from_archived(game: &ArchivedGame, username: &str) -> Result<GameRecord, SelectError> {
    let side = game
        .side_of(username)
        .ok_or_else(|| SelectError::NotAPlayer(username.to_string()))?;
    let text = game.pgn.as_deref().ok_or_else(|| {
        SelectError::MissingPgn(game.url.clone().unwrap_or_else(|| "?".to_string()))
    })?;

    let mut record = PgnGame::parse(text)?.replay(side)?;
    record.white = game.player(Side::White);
    record.black = game.player(Side::Black);
    Ok(record)
}

/// Replay the last game of a PGN file.
///
/// `side` wins over `username`; with neither, or a username that played
/// neither side, the game cannot be reviewed.
pub fn last_from_pgn(
    text: &str,
    username: Option<&str>,
    side: Option<Side>,
) -> Result<GameRecord, SelectError> {
    let game = pgn::parse_all(text)?.pop().ok_or(PgnError::Empty)?;
    let side = match (side, username) {
        (Some(side), _) => side,
        (None, Some(name)) => game
            .side_of(name)
            .ok_or_else(|| SelectError::NotAPlayer(name.to_string()))?,
        (None, None) => return Err(SelectError::NotAPlayer("?".to_string())),
    };
    Ok(game.replay(side)?)
}
