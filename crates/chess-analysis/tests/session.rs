//! Protocol session tests against scripted engines.
#![cfg(unix)]

mod common;

use std::time::Duration;

use chess_analysis::cancel;
use chess_analysis::{CancelSignal, EngineConfig, EngineError, ProtocolSession, SessionError};
use common::{scripted, HUNG, RESPONSIVE, START, STOP_ONLY};
use uci::{EngineCommand, GoOptions, ReplyTerminator};

/// Generous bound so a broken test fails instead of hanging.
const TEST_LIMIT: Duration = Duration::from_secs(10);

async fn start(config: &EngineConfig) -> ProtocolSession {
    tokio::time::timeout(TEST_LIMIT, ProtocolSession::start(config, CancelSignal::never()))
        .await
        .expect("handshake should not hang")
        .expect("scripted engine should start")
}

fn go() -> EngineCommand {
    EngineCommand::Go(GoOptions::depth(12))
}

#[tokio::test]
async fn test_handshake_reports_engine_name() {
    let mut session = start(&scripted(&[RESPONSIVE])).await;
    assert_eq!(session.engine_name(), "FakeFish 1.0");
    assert!(!session.is_closed());
    assert!(session.close().await);
    assert!(!session.close().await);
    assert!(session.is_closed());
    assert!(session.has_exited());
}

#[tokio::test]
async fn test_request_collects_whole_reply() {
    let mut session = start(&scripted(&[RESPONSIVE])).await;

    let none = session
        .request(&EngineCommand::Position {
            fen: START.to_string(),
        })
        .await
        .unwrap();
    assert!(none.is_empty());

    let reply = session.request(&go()).await.unwrap();
    let lines: Vec<&str> = reply.lines().collect();
    assert_eq!(
        lines,
        vec![
            "info depth 1 score cp 10 pv e2e4",
            "info depth 12 score cp 50 pv d2d4 d7d5",
            "bestmove d2d4 ponder d7d5",
        ]
    );
    assert!(!session.is_pending());

    let eval = uci::parse_evaluation(&reply).unwrap();
    assert_eq!(eval.score, uci::Score::Cp(50));
    assert_eq!(eval.best_move.as_deref(), Some("d2d4"));

    // Replies are attributed to the right request, one after another.
    let ready = session.request(&EngineCommand::IsReady).await.unwrap();
    assert_eq!(ready, "readyok\n");
    let eval = session.request(&EngineCommand::Eval).await.unwrap();
    assert!(eval.ends_with("Final evaluation       +0.40 (white side)\n"));

    session.close().await;
}

#[tokio::test]
async fn test_second_request_rejected_while_pending() {
    let mut session = start(&scripted(&[RESPONSIVE])).await;

    session
        .send(&EngineCommand::Position {
            fen: START.to_string(),
        })
        .await
        .unwrap();
    session.send(&go()).await.unwrap();
    assert!(session.is_pending());

    match session.send(&EngineCommand::IsReady).await {
        Err(SessionError::RequestPending { pending, rejected }) => {
            assert_eq!(pending, "go depth 12");
            assert_eq!(rejected, "isready");
        }
        other => panic!("Expected RequestPending, got {:?}", other),
    }

    let reply = session
        .await_reply(|line| ReplyTerminator::BestMove.matches(line))
        .await
        .unwrap();
    assert!(reply.ends_with("bestmove d2d4 ponder d7d5\n"));
    assert!(session.request(&EngineCommand::IsReady).await.is_ok());

    session.close().await;
}

#[tokio::test]
async fn test_abandoned_await_resumes_without_losing_output() {
    let mut session = start(&scripted(&[STOP_ONLY])).await;

    session.send(&go()).await.unwrap();
    let abandoned = tokio::time::timeout(
        Duration::from_millis(200),
        session.await_reply(|line| line.starts_with("bestmove")),
    )
    .await;
    assert!(abandoned.is_err());

    // Still waiting for the search, so only `stop` may be sent.
    assert!(matches!(
        session.send(&EngineCommand::IsReady).await,
        Err(SessionError::RequestPending { .. })
    ));
    session.send(&EngineCommand::Stop).await.unwrap();

    let reply = session
        .await_reply(|line| line.starts_with("bestmove"))
        .await
        .unwrap();
    assert_eq!(reply, "info depth 1 score cp 5 pv e2e4\nbestmove e2e4\n");

    session.close().await;
}

#[tokio::test]
async fn test_timeout_stops_search_and_session_recovers() {
    let mut config = scripted(&[STOP_ONLY]);
    config.reply_timeout_ms = 300;
    let mut session = start(&config).await;

    let result = tokio::time::timeout(TEST_LIMIT, session.request(&go()))
        .await
        .unwrap();
    match result {
        Err(e @ SessionError::Timeout(_)) => assert!(e.is_recoverable()),
        other => panic!("Expected Timeout, got {:?}", other),
    }
    assert!(!session.is_closed());
    assert!(!session.is_pending());

    // The late bestmove was drained, so the next reply is the right one.
    let ready = session.request(&EngineCommand::IsReady).await.unwrap();
    assert_eq!(ready, "readyok\n");

    session.close().await;
}

#[tokio::test]
async fn test_unanswered_stop_desynchronizes_and_closes() {
    let mut config = scripted(&[HUNG]);
    config.reply_timeout_ms = 200;
    config.stop_grace_ms = 200;
    let mut session = start(&config).await;

    let result = tokio::time::timeout(TEST_LIMIT, session.request(&go()))
        .await
        .unwrap();
    match result {
        Err(SessionError::Desynchronized(cmd)) => assert_eq!(cmd, "go depth 12"),
        other => panic!("Expected Desynchronized, got {:?}", other),
    }
    assert!(session.is_closed());
    assert!(session.has_exited());
    assert!(matches!(
        session.send(&EngineCommand::IsReady).await,
        Err(SessionError::Closed)
    ));
    assert!(!session.close().await);
}

#[tokio::test]
async fn test_cancel_interrupts_wait_and_kills_engine() {
    let (handle, signal) = cancel::channel();
    let mut config = scripted(&[HUNG]);
    config.reply_timeout_ms = 60_000;
    let mut session = ProtocolSession::start(&config, signal).await.unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });

    let result = tokio::time::timeout(TEST_LIMIT, session.request(&go()))
        .await
        .expect("cancel should interrupt the wait");
    assert!(matches!(result, Err(SessionError::Cancelled)));
    assert!(session.is_closed());
    assert!(session.has_exited());
    assert!(!session.close().await);
}

#[tokio::test]
async fn test_engine_exit_is_read_error() {
    let mut session = start(&scripted(&[common::CRASHES_ON_GO])).await;

    let result = tokio::time::timeout(TEST_LIMIT, session.request(&go()))
        .await
        .unwrap();
    match result {
        Err(SessionError::Read(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected Read error, got {:?}", other),
    }
    assert!(session.is_closed());
    assert!(matches!(
        session.request(&EngineCommand::IsReady).await,
        Err(SessionError::Closed)
    ));
}

#[tokio::test]
async fn test_silent_exit_fails_handshake() {
    let config = EngineConfig {
        path: "sh".to_string(),
        args: vec!["-c".to_string(), "exit 0".to_string()],
        ..EngineConfig::default()
    };
    let result = tokio::time::timeout(
        TEST_LIMIT,
        ProtocolSession::start(&config, CancelSignal::never()),
    )
    .await
    .unwrap();
    match result {
        Err(SessionError::Handshake(inner)) => assert!(matches!(
            *inner,
            SessionError::Read(_) | SessionError::Write(_)
        )),
        Err(other) => panic!("Expected Handshake error, got {:?}", other),
        Ok(_) => panic!("Expected Handshake error"),
    }
}

#[tokio::test]
async fn test_missing_binary_is_launch_error() {
    let config = EngineConfig::with_path("definitely-not-a-chess-engine");
    match ProtocolSession::start(&config, CancelSignal::never()).await {
        Err(SessionError::Engine(EngineError::Launch { path, .. })) => {
            assert_eq!(path, "definitely-not-a-chess-engine");
        }
        Err(other) => panic!("Expected Launch error, got {:?}", other),
        Ok(_) => panic!("Expected Launch error"),
    }
}
