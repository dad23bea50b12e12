//! Cooperative pause/cancel signalling
//!
//! A `ControlToken` is cloned into every discovery and capture task. Tasks poll
//! it at loop boundaries; nothing is interrupted mid-operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PAUSE_POLL: Duration = Duration::from_millis(200);

/// Shared cancellation and pause flags
#[derive(Debug, Clone, Default)]
pub struct ControlToken {
    cancelled: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl ControlToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that every task stop at its next boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Flips the pause flag and returns the new state
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks while paused, then reports whether work may continue
    ///
    /// Returns `false` once cancellation has been requested, including while
    /// paused.
    pub async fn proceed(&self) -> bool {
        while self.is_paused() && !self.is_cancelled() {
            tokio::time::sleep(PAUSE_POLL).await;
        }
        !self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = ControlToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_toggle_pause() {
        let token = ControlToken::new();
        assert!(token.toggle_pause());
        assert!(token.is_paused());
        assert!(!token.toggle_pause());
        assert!(!token.is_paused());
    }

    #[tokio::test]
    async fn test_proceed_when_running() {
        let token = ControlToken::new();
        assert!(token.proceed().await);
    }

    #[tokio::test]
    async fn test_proceed_stops_when_cancelled_while_paused() {
        let token = ControlToken::new();
        token.pause();

        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.proceed().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_proceed_resumes_after_pause() {
        let token = ControlToken::new();
        token.pause();

        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.proceed().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.resume();

        assert!(handle.await.unwrap());
    }
}
