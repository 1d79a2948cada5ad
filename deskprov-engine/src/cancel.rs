//! Cooperative cancellation for poll loops.
//!
//! The host framework reconciles under its own deadline; the tracker and
//! stabilizer sleep points must yield to it rather than block past it. A
//! [`CancelSource`] flips a watch channel; every [`CancelToken`] cloned from
//! it observes the flip, including mid-sleep.

use std::time::Duration;
use tokio::sync::watch;

/// The cancelling side. Dropping it without calling [`cancel`](Self::cancel)
/// means the tokens are simply never cancelled.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    /// Creates a new, un-cancelled source.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Creates a token observing this source.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Signals cancellation to every token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The observing side, cheap to clone into every loop that needs it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires, for call sites without a deadline.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is signalled; pends forever on a token
    /// whose source was dropped un-cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Source dropped without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Sleeps for `duration`, returning false if the token fired first.
pub async fn sleep_cancellable(duration: Duration, cancel: &CancelToken) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = cancel.cancelled() => false,
    }
}
