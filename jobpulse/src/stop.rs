//! Stop signals for poll loops.
//!
//! Every spawned loop (per-job status polling, the shared notification
//! poller, retirement timers) is paired with a [`StopToken`]. Stopping a
//! loop is an explicit, observable operation: the loop re-checks its token
//! when it resumes from any await, so a response that resolves after the
//! loop was stopped is discarded instead of acted on.

use std::sync::Arc;
use tokio::sync::watch;

/// A stop signal shared between a loop and its owner.
///
/// Cloning the token shares the underlying signal; stopping any clone stops
/// them all. Once stopped, a token never becomes live again; restarting a
/// loop means minting a fresh token.
///
/// # Examples
///
/// ```rust
/// use jobpulse::stop::StopToken;
///
/// #[tokio::main]
/// async fn main() {
///     let token = StopToken::new();
///     let loop_token = token.clone();
///
///     let handle = tokio::spawn(async move {
///         loop_token.stopped().await;
///     });
///
///     token.stop();
///     let _ = handle.await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StopToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// Create a new, live stop token.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Check whether stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Request that the paired loop stop.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }

    /// Wait for the stop signal.
    ///
    /// Returns immediately if already stopped.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                // Sender dropped, treat as stopped
                break;
            }
        }
    }

    /// Check whether two tokens share the same underlying signal.
    ///
    /// Used to tell a loop's own token apart from a replacement minted for a
    /// restarted loop, so a late-exiting loop never tears down its successor.
    #[must_use]
    pub fn same_token(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_token_starts_live() {
        let token = StopToken::new();
        assert!(!token.is_stopped());
    }

    #[test]
    fn test_stop_is_observed_by_clones() {
        let token = StopToken::new();
        let clone = token.clone();

        token.stop();
        assert!(clone.is_stopped());
    }

    #[test]
    fn test_same_token() {
        let token = StopToken::new();
        let clone = token.clone();
        let other = StopToken::new();

        assert!(token.same_token(&clone));
        assert!(!token.same_token(&other));
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiter() {
        let token = StopToken::new();

        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.stopped().await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.stop();

        handle.await.expect("waiter should complete");
        assert!(token.is_stopped());
    }

    #[tokio::test]
    async fn test_stopped_returns_immediately_when_already_stopped() {
        let token = StopToken::new();
        token.stop();
        token.stopped().await;
    }
}
