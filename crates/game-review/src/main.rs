//! Game Review - Reviews a chess.com game with a UCI engine.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chess_analysis::{cancel, AnalysisPipeline, EvalMode, GameRecord, Side};
use clap::{Parser, Subcommand, ValueEnum};
use game_review::archive::{self, ArchiveClient, ArchiveMonth, MonthlyArchive};
use game_review::config::ReviewConfig;
use game_review::{report, select};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "game-review")]
#[command(about = "Find the mistakes in your latest chess.com game")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value_os_t = ReviewConfig::config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a monthly archive into the cache
    Fetch {
        /// chess.com username (defaults to the configured one)
        #[arg(short, long)]
        user: Option<String>,
        /// Month to download as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<ArchiveMonth>,
    },
    /// Analyze a game and print its mistakes
    Review {
        /// chess.com username (defaults to the configured one)
        #[arg(short, long)]
        user: Option<String>,
        /// Archive month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<ArchiveMonth>,
        /// Review the last game of a PGN file instead of the archive
        #[arg(long)]
        pgn: Option<PathBuf>,
        /// Side to review when reading a PGN file
        #[arg(long, value_enum)]
        side: Option<SideArg>,
        /// Search depth per position
        #[arg(short, long)]
        depth: Option<u32>,
        /// Minimum evaluation drop in centipawns to flag a move
        #[arg(short, long)]
        threshold: Option<i32>,
        /// Engine executable
        #[arg(short, long)]
        engine: Option<String>,
        /// Use the engine's static evaluation instead of a search
        #[arg(long = "static")]
        static_eval: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Never download, only use the cache
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Side::White,
            SideArg::Black => Side::Black,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut config = ReviewConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Fetch { user, month } => {
            let username = username(&config, user)?;
            let month = month.unwrap_or_else(ArchiveMonth::current);
            let path = ArchiveClient::new()?
                .fetch_to_cache(&config.cache_dir, &username, month)
                .await
                .with_context(|| format!("Failed to fetch {} games for {}", username, month))?;
            println!("{}", path.display());
        }
        Commands::Review {
            user,
            month,
            pgn,
            side,
            depth,
            threshold,
            engine,
            static_eval,
            json,
            offline,
        } => {
            if let Some(depth) = depth {
                config.analysis.depth = depth;
            }
            if let Some(threshold) = threshold {
                config.analysis.threshold_cp = threshold;
            }
            if let Some(engine) = engine {
                config.engine.path = engine;
            }
            if static_eval {
                config.analysis.mode = EvalMode::Static;
            }

            let game = match pgn {
                Some(path) => {
                    let user = user.or_else(|| config.username.clone());
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    select::last_from_pgn(&text, user.as_deref(), side.map(Side::from))
                        .with_context(|| format!("Cannot review {}", path.display()))?
                }
                None => {
                    let username = username(&config, user)?;
                    let month = month.unwrap_or_else(ArchiveMonth::current);
                    let archive =
                        cached_archive(&config.cache_dir, &username, month, offline).await?;
                    select::latest_from_archive(&archive, &username)?
                }
            };

            review(&config, &game, json).await?;
        }
    }

    Ok(())
}

fn username(config: &ReviewConfig, user: Option<String>) -> anyhow::Result<String> {
    match user {
        Some(user) => Ok(user),
        None => Ok(config.username()?.to_string()),
    }
}

/// Read the archive from the cache, downloading it first if it is missing.
async fn cached_archive(
    cache_dir: &Path,
    username: &str,
    month: ArchiveMonth,
    offline: bool,
) -> anyhow::Result<MonthlyArchive> {
    let path = archive::cache_path(cache_dir, username, month);
    if !path.exists() {
        if offline {
            bail!("No cached archive at {} and --offline was given", path.display());
        }
        tracing::info!("No cached archive for {} {}, downloading", username, month);
        ArchiveClient::new()?
            .fetch_to_cache(cache_dir, username, month)
            .await
            .with_context(|| format!("Failed to fetch {} games for {}", username, month))?;
    }
    Ok(MonthlyArchive::load(&path)?)
}

async fn review(config: &ReviewConfig, game: &GameRecord, json: bool) -> anyhow::Result<()> {
    let (handle, signal) = cancel::channel();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping the engine");
            handle.cancel();
        }
    });

    tracing::info!(
        "Reviewing {} as {} ({} moves)",
        game.human_player().name,
        game.human,
        game.moves.len()
    );
    let pipeline =
        AnalysisPipeline::new(config.engine.clone(), config.analysis.clone()).with_cancel(signal);
    let analysis = pipeline
        .analyze(game)
        .await
        .with_context(|| format!("Analysis with {} failed", config.engine.path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", report::render(game, &analysis, &config.style));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag() {
        let cli = Cli::try_parse_from(["game-review", "fetch"]).unwrap();
        assert_eq!(cli.config, ReviewConfig::config_path());

        let cli = Cli::try_parse_from(["game-review", "review", "--offline", "--config", "other.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Commands::Review { offline: true, .. }));
    }
}
