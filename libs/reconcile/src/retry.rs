//! Retry bookkeeping for redelivered keys.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::Rng;

/// Exponential backoff configuration.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Base delay for first retry.
    pub base: Duration,

    /// Maximum delay.
    pub max: Duration,

    /// Jitter factor (0.0 to 1.0).
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

impl BackoffPolicy {
    /// Calculate delay for the given attempt number (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(31) as i32;
        let delay = self.base.as_millis() as f64 * 2.0_f64.powi(exponent);
        let delay = delay.min(self.max.as_millis() as f64);

        let jitter_range = delay * self.jitter.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::rng().random_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((delay + jitter).max(0.0) as u64)
    }
}

/// When to try a failed key again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    /// Failures recorded for the key in the current window, this one included.
    pub attempt: u32,

    /// Delay before the key is handed out again.
    pub delay: Duration,

    /// More than `max_retries` failures in the window; `delay` is pinned at
    /// the backoff ceiling.
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy)]
struct FailureWindow {
    count: u32,
    opened: Instant,
}

/// Per-key failure counts driving backoff.
///
/// Counts reset once a key's window has been open longer than `window`.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    backoff: BackoffPolicy,
    max_retries: u32,
    window: Duration,
    failures: BTreeMap<String, FailureWindow>,
}

impl RetryTracker {
    pub fn new(backoff: BackoffPolicy, max_retries: u32, window: Duration) -> Self {
        Self {
            backoff,
            max_retries,
            window,
            failures: BTreeMap::new(),
        }
    }

    /// Count a failure for `key` and schedule the next attempt.
    pub fn on_failure(&mut self, key: &str) -> Retry {
        let now = Instant::now();
        let entry = self
            .failures
            .entry(key.to_string())
            .or_insert(FailureWindow { count: 0, opened: now });

        if now.duration_since(entry.opened) > self.window {
            *entry = FailureWindow { count: 0, opened: now };
        }
        entry.count = entry.count.saturating_add(1);

        let attempt = entry.count;
        let exhausted = attempt > self.max_retries;
        let delay = if exhausted {
            self.backoff.max
        } else {
            self.backoff.delay(attempt - 1)
        };

        Retry {
            attempt,
            delay,
            exhausted,
        }
    }

    /// Forget `key` after it reconciled cleanly.
    pub fn on_success(&mut self, key: &str) {
        self.failures.remove(key);
    }

    /// Drop windows that have expired.
    pub fn prune(&mut self) {
        let now = Instant::now();
        let window = self.window;
        self.failures
            .retain(|_, failures| now.duration_since(failures.opened) <= window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_policy() {
        let policy = BackoffPolicy {
            jitter: 0.0,
            ..Default::default()
        };

        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_max() {
        let policy = BackoffPolicy {
            base: Duration::from_secs(1),
            max: Duration::from_secs(5),
            jitter: 0.0,
        };

        assert_eq!(policy.delay(10), Duration::from_secs(5));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let policy = BackoffPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay(2);
            assert!(delay >= Duration::from_millis(300));
            assert!(delay <= Duration::from_millis(500));
        }
    }

    fn tracker(max_retries: u32, window: Duration) -> RetryTracker {
        let backoff = BackoffPolicy {
            base: Duration::from_millis(10),
            max: Duration::from_secs(1),
            jitter: 0.0,
        };
        RetryTracker::new(backoff, max_retries, window)
    }

    #[test]
    fn test_failures_back_off_then_pin_at_ceiling() {
        let mut tracker = tracker(3, Duration::from_secs(60));

        let delays: Vec<_> = (0..3)
            .map(|_| tracker.on_failure("games/game-7"))
            .map(|retry| {
                assert!(!retry.exhausted);
                retry.delay
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40)
            ]
        );

        let retry = tracker.on_failure("games/game-7");
        assert_eq!(retry.attempt, 4);
        assert!(retry.exhausted);
        assert_eq!(retry.delay, Duration::from_secs(1));

        // Other keys are counted independently.
        assert_eq!(tracker.on_failure("games/game-8").attempt, 1);
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut tracker = tracker(3, Duration::from_secs(60));
        tracker.on_failure("games/game-7");
        tracker.on_failure("games/game-7");

        tracker.on_success("games/game-7");
        let retry = tracker.on_failure("games/game-7");
        assert_eq!(retry.attempt, 1);
        assert_eq!(retry.delay, Duration::from_millis(10));
    }

    #[test]
    fn test_expired_window_restarts_count() {
        let mut tracker = tracker(1, Duration::from_millis(1));
        tracker.on_failure("games/game-7");

        std::thread::sleep(Duration::from_millis(5));
        let retry = tracker.on_failure("games/game-7");
        assert_eq!(retry.attempt, 1);
        assert!(!retry.exhausted);
    }

    #[test]
    fn test_prune_drops_expired_windows() {
        let mut tracker = tracker(3, Duration::from_millis(1));
        tracker.on_failure("games/game-7");
        std::thread::sleep(Duration::from_millis(5));
        tracker.prune();
        assert!(tracker.failures.is_empty());
    }
}
