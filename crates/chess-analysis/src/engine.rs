//! Analysis engine subprocess.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

/// Errors that can occur when starting or tearing down an engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// The operating system refused to start the engine.
    #[error("Failed to launch engine '{path}': {source}")]
    Launch {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The process started without one of its standard pipes.
    #[error("Engine process has no {0} pipe")]
    MissingPipe(&'static str),
    /// The process has already been closed.
    #[error("Engine process is closed")]
    Closed,
}

/// How to start the engine and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Executable name (looked up on `PATH`) or path.
    #[serde(default = "default_path")]
    pub path: String,
    /// Extra command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Value for the engine's `Threads` option.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Value for the engine's `Hash` option in MB; the engine default if unset.
    #[serde(default)]
    pub hash_mb: Option<u32>,
    /// Upper bound on the time to wait for any single reply.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// How long a timed-out search gets to answer `stop` before the
    /// session is abandoned.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

fn default_path() -> String {
    "stockfish".to_string()
}

fn default_threads() -> u32 {
    4
}

fn default_reply_timeout_ms() -> u64 {
    30_000
}

fn default_stop_grace_ms() -> u64 {
    2_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            args: Vec::new(),
            threads: default_threads(),
            hash_mb: None,
            reply_timeout_ms: default_reply_timeout_ms(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl EngineConfig {
    /// Config for the executable at `path` with default limits.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// A running engine process and its standard pipes.
///
/// The process is killed when this value is dropped, so an early return or
/// a panic anywhere in the caller cannot leak it. [`EngineProcess::close`]
/// does the same teardown explicitly and reaps the process.
pub struct EngineProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    closed: bool,
}

impl EngineProcess {
    /// Start the engine.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if `config.path` names a file that does not exist
    /// - `EngineError::Launch` if the process cannot be started
    pub fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        let path = Path::new(&config.path);
        if path.components().count() > 1 && !path.exists() {
            return Err(EngineError::NotFound(config.path.clone()));
        }

        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Launch {
                path: config.path.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(EngineError::MissingPipe("stdout"))?;

        info!(path = %config.path, pid = ?child.id(), "Engine started");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: Some(BufReader::new(stdout)),
            closed: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns true once the process has terminated.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    pub(crate) fn stdin(&mut self) -> Result<&mut ChildStdin, EngineError> {
        self.stdin.as_mut().ok_or(EngineError::Closed)
    }

    pub(crate) fn stdout(&mut self) -> Result<&mut BufReader<ChildStdout>, EngineError> {
        self.stdout.as_mut().ok_or(EngineError::Closed)
    }

    /// Release the pipes and terminate the process.
    ///
    /// Returns true if this call performed the teardown, false if the
    /// process was already closed.
    pub async fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.stdin = None;
        self.stdout = None;

        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Failed to kill engine process");
        }
        debug!("Engine process closed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_not_found() {
        let config = EngineConfig::with_path("/nonexistent/path/to/stockfish");
        match EngineProcess::start(&config) {
            Err(EngineError::NotFound(path)) => {
                assert_eq!(path, "/nonexistent/path/to/stockfish");
            }
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_engine_launch_failure() {
        let config = EngineConfig::with_path("no-such-engine-binary-on-path");
        let result = EngineProcess::start(&config);
        assert!(matches!(result, Err(EngineError::Launch { .. })));
    }

    #[test]
    fn test_engine_error_display() {
        let launch = EngineError::Launch {
            path: "stockfish".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        assert!(launch.to_string().contains("Failed to launch engine 'stockfish'"));

        let not_found = EngineError::NotFound("/path/to/engine".to_string());
        assert!(not_found.to_string().contains("/path/to/engine"));

        assert_eq!(EngineError::Closed.to_string(), "Engine process is closed");
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.path, "stockfish");
        assert_eq!(config.threads, 4);
        assert_eq!(config.hash_mb, None);
        assert_eq!(config.reply_timeout(), Duration::from_secs(30));
        assert_eq!(config.stop_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_config_partial_deserialize() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"path": "/usr/games/stockfish", "hash_mb": 256}"#).unwrap();
        assert_eq!(config.path, "/usr/games/stockfish");
        assert_eq!(config.hash_mb, Some(256));
        assert_eq!(config.threads, 4);
        assert!(config.args.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_is_idempotent() {
        let config = EngineConfig {
            path: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 30".to_string()],
            ..EngineConfig::default()
        };
        let mut process = EngineProcess::start(&config).unwrap();
        assert!(!process.is_closed());
        assert!(!process.has_exited());

        assert!(process.close().await);
        assert!(process.is_closed());
        assert!(process.has_exited());
        assert!(!process.close().await);
        assert!(matches!(process.stdin(), Err(EngineError::Closed)));
    }
}
