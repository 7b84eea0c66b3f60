//! Scripted stand-in engines for tests that must not depend on Stockfish.
//!
//! Each engine is a small POSIX shell loop speaking just enough UCI.
#![allow(dead_code)]

use chess_analysis::{EngineConfig, GameRecord, PlayerInfo, Side};

/// Handshake lines shared by every scripted engine.
const HANDSHAKE: &str = r#"
    uci) echo "id name FakeFish 1.0"; echo "id author Nobody"; echo "uciok" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
"#;

/// Answers searches by side to move: White is +50 and prefers d2d4, Black is
/// +80 and prefers e7e5. Answers `eval` with +0.40 from White's side.
pub const RESPONSIVE: &str = r#"
    "position fen "*) fen="${line#position fen }" ;;
    go*)
      case "$fen" in
        *" w "*) echo "info depth 1 score cp 10 pv e2e4"; echo "info depth 12 score cp 50 pv d2d4 d7d5"; echo "bestmove d2d4 ponder d7d5" ;;
        *) echo "info depth 12 score cp 80 pv e7e5"; echo "bestmove e7e5" ;;
      esac ;;
    eval) echo " Contributing terms:"; echo "Final evaluation       +0.40 (white side)" ;;
"#;

/// Like [`RESPONSIVE`] but only finishes Black's searches once told to stop.
pub const SLOW_FOR_BLACK: &str = r#"
    "position fen "*) fen="${line#position fen }" ;;
    go*)
      case "$fen" in
        *" w "*) echo "info depth 12 score cp 50 pv d2d4"; echo "bestmove d2d4" ;;
        *) echo "info depth 1 score cp 999 pv a7a6" ;;
      esac ;;
    stop) echo "bestmove a7a6" ;;
"#;

/// Starts every search but only finishes it when told to stop.
pub const STOP_ONLY: &str = r#"
    go*) echo "info depth 1 score cp 5 pv e2e4" ;;
    stop) echo "bestmove e2e4" ;;
"#;

/// Never finishes a search, not even when told to stop.
pub const HUNG: &str = r#"
    go*) echo "info depth 1 score cp 5 pv e2e4" ;;
"#;

/// Finishes searches without ever reporting a score.
pub const SCORELESS: &str = r#"
    go*) echo "info depth 3 nodes 100 pv e2e4"; echo "bestmove e2e4" ;;
"#;

/// Exits as soon as a search is requested.
pub const CRASHES_ON_GO: &str = r#"
    go*) exit 1 ;;
"#;

/// Exits if asked about the final position of the scholar's mate game.
pub const REFUSES_MATED_POSITION: &str = r#"
    "position fen "*"pppp1Qpp"*) exit 3 ;;
"#;

/// Build the engine config for a scripted engine made of `cases`, tried in
/// order, with short timeouts.
pub fn scripted(cases: &[&str]) -> EngineConfig {
    let script = format!(
        "fen=\"\"\nwhile IFS= read -r line; do\n  case \"$line\" in\n{}{}\n  esac\ndone\n",
        HANDSHAKE,
        cases.concat()
    );
    EngineConfig {
        path: "sh".to_string(),
        args: vec!["-c".to_string(), script],
        threads: 1,
        hash_mb: Some(16),
        reply_timeout_ms: 2_000,
        stop_grace_ms: 500,
    }
}

pub const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
pub const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";

/// 1. e4 e5
pub fn opening(human: Side) -> GameRecord {
    GameRecord {
        positions: vec![START.into(), AFTER_E4.into(), AFTER_E5.into()],
        moves: vec!["e2e4".into(), "e7e5".into()],
        human,
        outcome: None,
        white: PlayerInfo::new("alice", Some(1432)),
        black: PlayerInfo::new("bob", Some(1390)),
    }
}

/// 1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7#
pub fn scholars_mate(human: Side) -> GameRecord {
    let positions = [
        START,
        AFTER_E4,
        AFTER_E5,
        "rnbqkbnr/pppp1ppp/8/4p2Q/4P3/8/PPPP1PPP/RNB1KBNR b KQkq - 1 2",
        "r1bqkbnr/pppp1ppp/2n5/4p2Q/4P3/8/PPPP1PPP/RNB1KBNR w KQkq - 2 3",
        "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3",
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
        "r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4",
    ];
    let moves = ["e2e4", "e7e5", "d1h5", "b8c6", "f1c4", "g8f6", "h5f7"];
    GameRecord {
        positions: positions.iter().map(|p| p.to_string()).collect(),
        moves: moves.iter().map(|m| m.to_string()).collect(),
        human,
        outcome: Some(chess_analysis::GameOutcome::Checkmate {
            winner: Side::White,
        }),
        white: PlayerInfo::new("alice", None),
        black: PlayerInfo::new("bob", None),
    }
}
