//! Time source abstraction for expiry math and retry delays.
//!
//! All session timestamps are unix seconds, and every sleep goes through the
//! clock so retry behavior can be tested without real waits.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time provider used by the session manager.
#[allow(async_fn_in_trait)]
pub trait Clock: Send + Sync {
    /// Current time as unix seconds.
    fn now_unix(&self) -> u64;

    /// Sleep for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time with real sleeps. The default for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually advanced clock. Sleeps advance the clock instead of waiting,
/// so retry/backoff paths run instantly in tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock starting at the given unix-seconds timestamp.
    pub fn starting_at(secs: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(secs * 1000)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.millis.load(Ordering::SeqCst) / 1000
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::starting_at(1000);
        assert_eq!(clock.now_unix(), 1000);

        clock.advance(Duration::from_secs(61));
        assert_eq!(clock.now_unix(), 1061);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_without_waiting() {
        let clock = ManualClock::starting_at(0);
        clock.sleep(Duration::from_secs(3600)).await;
        assert_eq!(clock.now_unix(), 3600);
    }

    #[test]
    fn test_manual_clock_sub_second_precision() {
        let clock = ManualClock::starting_at(10);
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now_unix(), 10);
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now_unix(), 11);
    }
}
