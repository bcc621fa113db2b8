//! Deadlines and timeout helpers.
//!
//! All instants are `tokio::time::Instant`, which is monotonic and follows the
//! paused test clock, so poll budgets are immune to wall-clock adjustments.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Timeout, timeout};

/// Extension trait for adding timeouts to futures.
pub trait TimeoutExt: Sized {
    /// Wrap this future with a timeout.
    fn with_timeout(self, duration: Duration) -> Timeout<Self>;

    /// Wrap this future with a timeout in milliseconds.
    fn with_timeout_ms(self, ms: u64) -> Timeout<Self> {
        self.with_timeout(Duration::from_millis(ms))
    }
}

impl<F: Future> TimeoutExt for F {
    fn with_timeout(self, duration: Duration) -> Timeout<Self> {
        timeout(duration, self)
    }
}

/// A fixed point in time that bounds a multi-step operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: Instant,
    deadline: Instant,
}

impl Deadline {
    /// A deadline `budget` from now.
    #[must_use]
    pub fn from_now(budget: Duration) -> Self {
        Self::starting_at(Instant::now(), budget)
    }

    /// A deadline `budget` after `start`.
    #[must_use]
    pub fn starting_at(start: Instant, budget: Duration) -> Self {
        Self {
            start,
            deadline: start + budget,
        }
    }

    /// When the tracked operation started.
    #[must_use]
    pub const fn start(&self) -> Instant {
        self.start
    }

    /// The deadline instant.
    #[must_use]
    pub const fn instant(&self) -> Instant {
        self.deadline
    }

    /// Time since the start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.start)
    }

    /// Check if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Check whether work scheduled at `at` may still start.
    ///
    /// Only instants strictly before the deadline qualify.
    #[must_use]
    pub fn admits(&self, at: Instant) -> bool {
        at < self.deadline
    }

    /// Get the remaining time until the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Apply this deadline to a future.
    pub fn apply<F: Future>(&self, future: F) -> Timeout<F> {
        timeout(self.remaining(), future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_tracks_paused_clock() {
        let deadline = Deadline::from_now(Duration::from_millis(100));
        assert!(!deadline.is_expired());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(deadline.elapsed(), Duration::from_millis(40));
        assert_eq!(deadline.remaining(), Duration::from_millis(60));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(deadline.is_expired());
    }

    #[test]
    fn admits_is_strict() {
        let start = Instant::now();
        let deadline = Deadline::starting_at(start, Duration::from_millis(500));
        assert!(deadline.admits(start + Duration::from_millis(400)));
        assert!(!deadline.admits(start + Duration::from_millis(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn apply_times_out() {
        let deadline = Deadline::from_now(Duration::from_millis(10));
        let result = deadline.apply(std::future::pending::<()>()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn timeout_ext() {
        let result = async { 42 }.with_timeout_ms(1000).await;
        assert_eq!(result.ok(), Some(42));
    }
}
