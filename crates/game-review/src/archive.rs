//! chess.com monthly game archives: download, on-disk cache and decoding.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chess_analysis::{PlayerInfo, Side};
use chrono::{Datelike, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const API_BASE: &str = "https://api.chess.com/pub/player";

/// Errors that can occur while retrieving or reading an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The HTTP request could not be made.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    /// chess.com answered with an error status.
    #[error("HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },
    /// Reading or writing the cache failed.
    #[error("Cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The archive is not valid JSON of the expected shape.
    #[error("Archive JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),
    /// The archive contains no game with a PGN.
    #[error("No games in archive for {0}")]
    NoGames(String),
    /// A month was not given as `YYYY-MM`.
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
}

/// A calendar month of games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveMonth {
    pub year: i32,
    pub month: u32,
}

impl ArchiveMonth {
    /// The current month in UTC.
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }
}

impl FromStr for ArchiveMonth {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArchiveError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once(['-', '/']).ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for ArchiveMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A player entry of an archived game.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchivedPlayer {
    pub username: String,
    #[serde(default)]
    pub rating: Option<u32>,
    /// chess.com result code (`win`, `checkmated`, `resigned`, `agreed`, ...).
    #[serde(default)]
    pub result: Option<String>,
}

/// One game of a monthly archive.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchivedGame {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pgn: Option<String>,
    /// Unix time the game ended.
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub rules: Option<String>,
    pub white: ArchivedPlayer,
    pub black: ArchivedPlayer,
}

impl ArchivedGame {
    /// Which side `username` played, compared case-insensitively.
    pub fn side_of(&self, username: &str) -> Option<Side> {
        if self.white.username.eq_ignore_ascii_case(username) {
            Some(Side::White)
        } else if self.black.username.eq_ignore_ascii_case(username) {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn player(&self, side: Side) -> PlayerInfo {
        let player = match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        };
        PlayerInfo::new(player.username.clone(), player.rating)
    }
}

/// The body of `GET /pub/player/<user>/games/<YYYY>/<MM>`.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyArchive {
    #[serde(default)]
    pub games: Vec<ArchivedGame>,
}

impl MonthlyArchive {
    pub fn parse(json: &str) -> Result<Self, ArchiveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a cached archive.
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArchiveError::Cache {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&json)
    }

    /// The most recently finished standard chess game with a PGN.
    pub fn latest_game(&self) -> Option<&ArchivedGame> {
        self.games
            .iter()
            .filter(|g| g.pgn.is_some())
            .filter(|g| g.rules.as_deref().map_or(true, |r| r == "chess"))
            .max_by_key(|g| g.end_time.unwrap_or(i64::MIN))
    }
}

/// Where the archive of `username` for `month` is cached.
pub fn cache_path(cache_dir: &Path, username: &str, month: ArchiveMonth) -> PathBuf {
    cache_dir.join(format!(
        "{}-{:04}-{:02}.json",
        username.to_lowercase(),
        month.year,
        month.month
    ))
}

/// HTTP client for the chess.com published-data API.
pub struct ArchiveClient {
    client: Client,
}

impl ArchiveClient {
    pub fn new() -> Result<Self, ArchiveError> {
        let client = Client::builder()
            .user_agent(concat!("game-review/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Download the raw archive body.
    pub async fn fetch(&self, username: &str, month: ArchiveMonth) -> Result<String, ArchiveError> {
        let url = format!(
            "{}/{}/games/{:04}/{:02}",
            API_BASE,
            username.to_lowercase(),
            month.year,
            month.month
        );
        debug!(%url, "Fetching archive");

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ArchiveError::Status {
                status: resp.status(),
                url,
            });
        }
        Ok(resp.text().await?)
    }

    /// Download the archive and store it in the cache, returning its path.
    pub async fn fetch_to_cache(
        &self,
        cache_dir: &Path,
        username: &str,
        month: ArchiveMonth,
    ) -> Result<PathBuf, ArchiveError> {
        let body = self.fetch(username, month).await?;
        // Refuse to cache something that is not an archive.
        let archive = MonthlyArchive::parse(&body)?;
        let path = store(cache_dir, username, month, &body)?;
        info!(path = %path.display(), games = archive.games.len(), "Archive cached");
        Ok(path)
    }
}

/// Write a raw archive body to the cache.
pub fn store(
    cache_dir: &Path,
    username: &str,
    month: ArchiveMonth,
    body: &str,
) -> Result<PathBuf, ArchiveError> {
    let cache_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ArchiveError::Cache { path, source }
    };
    std::fs::create_dir_all(cache_dir).map_err(cache_err(cache_dir))?;
    let path = cache_path(cache_dir, username, month);
    std::fs::write(&path, body).map_err(cache_err(&path))?;
    Ok(path)
}
