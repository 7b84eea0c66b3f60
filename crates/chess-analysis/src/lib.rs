//! Game review with a UCI analysis engine.
//!
//! This crate drives an external engine such as Stockfish over its
//! standard input and output, evaluates every position of a game, and
//! flags the moves where the reviewed player fell well short of the
//! engine's recommendation.
//!
//! # Overview
//!
//! - [`EngineProcess`] - The engine subprocess and its pipes
//! - [`ProtocolSession`] - One command and one reply at a time over those pipes
//! - [`AnalysisPipeline`] - Evaluates a whole [`GameRecord`] into an [`AnalysisReport`]
//! - [`CancelHandle`] - Stops a running analysis and kills the engine
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{AnalysisConfig, AnalysisPipeline, EngineConfig};
//!
//! let pipeline = AnalysisPipeline::new(EngineConfig::default(), AnalysisConfig::default());
//! let report = pipeline.analyze(&record).await?;
//! for mistake in &report.mistakes {
//!     println!("{}: played {}, engine preferred {}", mistake.move_number, mistake.played_move, mistake.recommended_move);
//! }
//! ```

pub mod cancel;
pub mod engine;
pub mod evaluation;
pub mod game;
pub mod pipeline;
pub mod quality;
pub mod session;

pub use cancel::{CancelHandle, CancelSignal};
pub use engine::{EngineConfig, EngineError, EngineProcess};
pub use evaluation::{EvaluationResult, PositionEvaluation, Unavailable};
pub use game::{GameOutcome, GameRecord, PlayerInfo, Side};
pub use pipeline::{AnalysisConfig, AnalysisError, AnalysisPipeline, EvalMode};
pub use quality::{AnalysisReport, FlaggedMistake, MoveQuality};
pub use session::{ProtocolSession, SessionError};
