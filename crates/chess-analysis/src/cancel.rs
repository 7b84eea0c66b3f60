//! Caller-initiated cancellation of a running analysis.

use tokio::sync::watch;

/// Create a connected handle/signal pair.
pub fn channel() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Requests cancellation. Held by the caller (e.g. a Ctrl+C listener).
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal every connected [`CancelSignal`]. Calling it twice is harmless.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes cancellation. Held by the engine session.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        channel().1
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// If every handle is dropped without cancelling, this never resolves.
    /// Safe to use as a `tokio::select!` branch.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, mut signal) = channel();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn(async move {
            signal.cancelled().await;
            signal.is_cancelled()
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let cancelled = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(cancelled);
    }

    #[tokio::test]
    async fn test_cancel_before_wait_resolves_immediately() {
        let (handle, mut signal) = channel();
        handle.cancel();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already cancelled");
    }

    #[tokio::test]
    async fn test_never_signal_stays_pending() {
        let mut signal = CancelSignal::never();
        let result = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(result.is_err());
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cloned_signals_all_fire() {
        let (handle, signal) = channel();
        let mut a = signal.clone();
        let mut b = signal;
        handle.cancel();
        a.cancelled().await;
        b.cancelled().await;
    }
}
