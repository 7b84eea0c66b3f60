//! Request/reply protocol over an engine's pipes.
//!
//! The engine's output has no framing, so a reply is only known to be
//! complete when a line satisfies the predicate for the command that caused
//! it (`uciok`, `readyok`, `bestmove ...`, `Final evaluation ...`). Only one
//! such request may be outstanding at a time; otherwise lines of two replies
//! could interleave and be attributed to the wrong request.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uci::{EngineCommand, ReplyTerminator};

use crate::cancel::CancelSignal;
use crate::engine::{EngineConfig, EngineError, EngineProcess};

/// Errors that can occur while talking to an engine.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The engine could not be started, or is gone.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The engine started but did not complete the `uci`/`isready` handshake.
    #[error("Engine handshake failed: {0}")]
    Handshake(#[source] Box<SessionError>),
    /// Writing a command failed, usually because the engine exited.
    #[error("Failed to write to engine: {0}")]
    Write(#[source] io::Error),
    /// Reading output failed or the engine closed its output.
    #[error("Failed to read from engine: {0}")]
    Read(#[source] io::Error),
    /// No complete reply arrived in time. The engine was stopped and its
    /// late output discarded, so the session is still usable.
    #[error("No reply from engine within {0:?}")]
    Timeout(Duration),
    /// A command was issued while another still awaits its reply.
    #[error("Cannot send '{rejected}' while '{pending}' awaits its reply")]
    RequestPending { pending: String, rejected: String },
    /// The session was closed.
    #[error("Engine session is closed")]
    Closed,
    /// A timed-out request could not be drained, so later replies could no
    /// longer be attributed reliably. The session has been closed.
    #[error("Engine output out of sync after '{0}' timed out")]
    Desynchronized(String),
    /// The caller cancelled the analysis. The session has been closed.
    #[error("Cancelled")]
    Cancelled,
}

impl SessionError {
    /// Returns true if the session can keep serving requests after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }
}

#[derive(Debug)]
struct Pending {
    command: String,
    terminator: ReplyTerminator,
}

enum ReadOutcome {
    Line(io::Result<usize>),
    TimedOut,
    Cancelled,
}

/// A conversation with one engine process.
pub struct ProtocolSession {
    process: EngineProcess,
    /// Bytes of a line not yet terminated by a newline.
    line_buf: Vec<u8>,
    /// Lines of the reply currently being collected.
    reply: String,
    pending: Option<Pending>,
    engine_name: String,
    reply_timeout: Duration,
    stop_grace: Duration,
    cancel: CancelSignal,
}

impl ProtocolSession {
    /// Start the engine and perform the `uci`/`isready` handshake.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot be launched or does not complete the
    /// handshake within the reply timeout.
    pub async fn start(config: &EngineConfig, cancel: CancelSignal) -> Result<Self, SessionError> {
        let process = EngineProcess::start(config)?;
        let mut session = Self::new(process, config, cancel);
        if let Err(e) = session.handshake().await {
            session.close().await;
            return Err(match e {
                SessionError::Cancelled => e,
                other => SessionError::Handshake(Box::new(other)),
            });
        }
        Ok(session)
    }

    /// Wrap an already running process without any handshake.
    pub fn new(process: EngineProcess, config: &EngineConfig, cancel: CancelSignal) -> Self {
        Self {
            process,
            line_buf: Vec::new(),
            reply: String::new(),
            pending: None,
            engine_name: String::new(),
            reply_timeout: config.reply_timeout(),
            stop_grace: config.stop_grace(),
            cancel,
        }
    }

    async fn handshake(&mut self) -> Result<(), SessionError> {
        let reply = self.request(&EngineCommand::Uci).await?;
        self.engine_name =
            uci::parse_engine_name(&reply).unwrap_or_else(|| "Unknown Engine".to_string());
        self.request(&EngineCommand::IsReady).await?;
        info!(engine = %self.engine_name, "Engine ready");
        Ok(())
    }

    /// Name the engine reported during the handshake.
    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn is_closed(&self) -> bool {
        self.process.is_closed()
    }

    /// Returns true once the engine process has terminated.
    pub fn has_exited(&mut self) -> bool {
        self.process.has_exited()
    }

    /// Returns true while a request awaits its reply.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Write one command line to the engine.
    ///
    /// If the command produces a reply, the session expects that reply to be
    /// collected with [`ProtocolSession::await_reply`] before any further
    /// command is sent. `stop` is the one command allowed while a reply is
    /// pending, since it only hastens that reply.
    ///
    /// # Errors
    ///
    /// - `SessionError::RequestPending` if another reply is still expected
    /// - `SessionError::Write` if the engine's input is gone; the session is closed
    pub async fn send(&mut self, command: &EngineCommand) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        if let Some(pending) = &self.pending {
            if *command != EngineCommand::Stop {
                return Err(SessionError::RequestPending {
                    pending: pending.command.clone(),
                    rejected: command.to_uci(),
                });
            }
        }

        let line = command.to_uci();
        self.write_line(&line).await?;
        if let Some(terminator) = command.reply() {
            self.pending = Some(Pending {
                command: line,
                terminator,
            });
        }
        Ok(())
    }

    /// Read output until a line satisfies `is_last`, returning every line
    /// read (including that one), newline-separated.
    ///
    /// Bounded by the reply timeout. On timeout a pending search is sent
    /// `stop` and its remaining output is drained so the next request starts
    /// on a clean stream. Dropping the returned future loses no output: a
    /// later call resumes where this one left off.
    ///
    /// # Errors
    ///
    /// - `SessionError::Timeout` if no matching line arrived in time
    /// - `SessionError::Desynchronized` if the timed-out reply could not be drained
    /// - `SessionError::Read` if the engine closed its output
    /// - `SessionError::Cancelled` if the cancel signal fired
    pub async fn await_reply<F>(&mut self, is_last: F) -> Result<String, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let deadline = Instant::now() + self.reply_timeout;
        loop {
            match self.read_line(deadline).await {
                Ok(line) => {
                    let last = is_last(&line);
                    self.reply.push_str(&line);
                    self.reply.push('\n');
                    if last {
                        self.pending = None;
                        return Ok(std::mem::take(&mut self.reply));
                    }
                }
                Err(SessionError::Timeout(after)) => {
                    self.recover_from_timeout().await?;
                    return Err(SessionError::Timeout(after));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a command and collect its complete reply.
    ///
    /// Commands without a reply (e.g. `position`) return an empty string
    /// once written.
    pub async fn request(&mut self, command: &EngineCommand) -> Result<String, SessionError> {
        self.send(command).await?;
        match command.reply() {
            Some(terminator) => self.await_reply(|line| terminator.matches(line)).await,
            None => Ok(String::new()),
        }
    }

    /// Ask the engine to quit, then release the process.
    ///
    /// Returns true if this call performed the teardown.
    pub async fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        if let Ok(stdin) = self.process.stdin() {
            let _ = stdin.write_all(b"quit\n").await;
            let _ = stdin.flush().await;
        }
        self.teardown().await
    }

    async fn teardown(&mut self) -> bool {
        self.pending = None;
        self.reply.clear();
        self.line_buf.clear();
        self.process.close().await
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        let stdin = self.process.stdin()?;
        let result = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(cmd = %line, "engine <");
                Ok(())
            }
            Err(e) => {
                warn!(cmd = %line, error = %e, "Engine write failed");
                self.teardown().await;
                Err(SessionError::Write(e))
            }
        }
    }

    /// Read one line, bounded by `deadline` and the cancel signal.
    async fn read_line(&mut self, deadline: Instant) -> Result<String, SessionError> {
        let outcome = {
            let Self {
                process,
                line_buf,
                cancel,
                ..
            } = self;
            let stdout = process.stdout()?;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => ReadOutcome::Cancelled,
                read = tokio::time::timeout_at(deadline, stdout.read_until(b'\n', line_buf)) => {
                    match read {
                        Ok(result) => ReadOutcome::Line(result),
                        Err(_) => ReadOutcome::TimedOut,
                    }
                }
            }
        };

        match outcome {
            ReadOutcome::Line(Ok(0)) => {
                warn!("Engine closed its output");
                self.teardown().await;
                Err(SessionError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "engine closed its output",
                )))
            }
            ReadOutcome::Line(Ok(_)) => {
                let line = String::from_utf8_lossy(&self.line_buf)
                    .trim_end()
                    .to_string();
                self.line_buf.clear();
                debug!(line = %line, "engine >");
                Ok(line)
            }
            ReadOutcome::Line(Err(e)) => {
                warn!(error = %e, "Engine read failed");
                self.teardown().await;
                Err(SessionError::Read(e))
            }
            ReadOutcome::TimedOut => Err(SessionError::Timeout(self.reply_timeout)),
            ReadOutcome::Cancelled => {
                info!("Analysis cancelled, closing engine");
                self.teardown().await;
                Err(SessionError::Cancelled)
            }
        }
    }

    /// Stop a timed-out search and discard the rest of its reply.
    async fn recover_from_timeout(&mut self) -> Result<(), SessionError> {
        self.reply.clear();
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        warn!(cmd = %pending.command, timeout = ?self.reply_timeout, "Engine reply timed out, sending stop");

        self.write_line(&EngineCommand::Stop.to_uci()).await?;
        let deadline = Instant::now() + self.stop_grace;
        loop {
            match self.read_line(deadline).await {
                Ok(line) if pending.terminator.matches(&line) => {
                    debug!(cmd = %pending.command, "Discarded late reply");
                    return Ok(());
                }
                Ok(_) => {}
                Err(SessionError::Timeout(_)) => {
                    warn!(cmd = %pending.command, "Engine did not answer stop, closing");
                    self.teardown().await;
                    return Err(SessionError::Desynchronized(pending.command));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
