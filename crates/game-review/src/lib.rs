//! Game Review - Find the mistakes in your latest chess.com game.
//!
//! This crate downloads a player's monthly game archive, replays the most
//! recent game, has a UCI engine evaluate every position, and prints the
//! moves where the player lost the most against the engine's choice.
//!
//! # Modules
//!
//! - [`archive`] - chess.com archive download and cache
//! - [`config`] - `review.toml` settings
//! - [`pgn`] - PGN parsing and replay
//! - [`select`] - Choosing the game and the reviewed side
//! - [`report`] - Text rendering of the analysis

pub mod archive;
pub mod config;
pub mod pgn;
pub mod report;
pub mod select;
