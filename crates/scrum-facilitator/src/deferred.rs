//! Fixed-delay work guarded by the session's cancellation token

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A pending delay that the session can abandon.
///
/// Used for the simulated typing pause and for scripted follow-up turns.
#[derive(Debug, Clone)]
pub struct DeferredTurn {
    delay: Duration,
    cancel: CancellationToken,
}

impl DeferredTurn {
    pub fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self { delay, cancel }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the delay. Returns `false` if the session was cancelled first.
    pub async fn elapsed(self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapses_after_delay() {
        let start = tokio::time::Instant::now();
        let turn = DeferredTurn::new(Duration::from_millis(3000), CancellationToken::new());
        assert_eq!(turn.delay(), Duration::from_millis(3000));
        assert!(turn.elapsed().await);
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_mid_wait() {
        let cancel = CancellationToken::new();
        let turn = DeferredTurn::new(Duration::from_secs(10), cancel.clone());
        let task = tokio::spawn(turn.elapsed());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        assert!(!task.await.unwrap());
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!DeferredTurn::new(Duration::from_secs(60), cancel).elapsed().await);
    }
}
