//! Metrics collection for pollers and followers.
//!
//! Metrics are plain atomics; attach an `Arc` of [`PollMetrics`] or
//! [`FollowerMetrics`] to a poller or follower to have it report into them.
//!
//! ```rust
//! use rust_eventually::metrics::{Counter, Gauge, Timer};
//!
//! let counter = Counter::new();
//! counter.inc();
//!
//! let gauge = Gauge::new();
//! gauge.set(42);
//!
//! let timer = Timer::start();
//! let _elapsed = timer.stop();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::poll::PollOutcome;

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by n.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// A gauge metric.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement by 1, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A histogram of durations in seconds.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    /// Sum of all values, stored as `f64` bits.
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create with default buckets (1 ms to 30 s).
    #[must_use]
    pub fn new() -> Self {
        Self::with_buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ])
    }

    /// Create with custom buckets.
    #[must_use]
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        let counts = (0..=buckets.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum: AtomicU64::new(0f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value.
    pub fn observe(&self, value: f64) {
        let idx = self
            .buckets
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.buckets.len());
        self.counts[idx].fetch_add(1, Ordering::Relaxed);

        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Observe a duration.
    pub fn observe_duration(&self, duration: Duration) {
        self.observe(duration.as_secs_f64());
    }

    /// Get the count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get the sum of all observed values.
    #[must_use]
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Get bucket counts; the last entry counts values above every bucket.
    #[must_use]
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer for measuring durations on the tokio clock.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop and return duration in seconds.
    #[must_use]
    pub fn stop(self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop and record to histogram.
    pub fn record_to(self, histogram: &Histogram) {
        histogram.observe(self.stop());
    }
}

/// Metrics for condition polls.
#[derive(Debug, Default)]
pub struct PollMetrics {
    /// Polls started.
    pub polls: Counter,
    /// Attempts made across all polls.
    pub attempts: Counter,
    /// Attempts whose producer failed.
    pub transport_errors: Counter,
    /// Polls that succeeded.
    pub succeeded: Counter,
    /// Polls that ran out of time.
    pub timed_out: Counter,
    /// Polls cancelled by the caller.
    pub cancelled: Counter,
    /// Consistently polls that saw the condition turn false.
    pub violated: Counter,
    /// Polls stopped by an ended stream.
    pub ended: Counter,
    /// Polls currently running.
    pub active: Gauge,
    /// Poll duration histogram.
    pub duration: Histogram,
}

impl PollMetrics {
    /// Create new poll metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a poll as started; the returned timer measures its duration.
    #[must_use]
    pub(crate) fn poll_started(&self) -> Timer {
        self.polls.inc();
        self.active.inc();
        Timer::start()
    }

    pub(crate) fn poll_finished(&self, outcome: PollOutcome, timer: Timer) {
        self.active.dec();
        timer.record_to(&self.duration);
        match outcome {
            PollOutcome::Succeeded => self.succeeded.inc(),
            PollOutcome::TimedOut => self.timed_out.inc(),
            PollOutcome::Cancelled => self.cancelled.inc(),
            PollOutcome::PolarityViolated => self.violated.inc(),
            PollOutcome::Ended => self.ended.inc(),
        }
    }

    /// Report a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            polls: self.polls.get(),
            attempts: self.attempts.get(),
            transport_errors: self.transport_errors.get(),
            succeeded: self.succeeded.get(),
            timed_out: self.timed_out.get(),
            cancelled: self.cancelled.get(),
            violated: self.violated.get(),
            ended: self.ended.get(),
            active: self.active.get(),
        }
    }
}

/// Snapshot of [`PollMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    /// Polls started.
    pub polls: u64,
    /// Attempts made.
    pub attempts: u64,
    /// Failed producer calls.
    pub transport_errors: u64,
    /// Successful polls.
    pub succeeded: u64,
    /// Timed out polls.
    pub timed_out: u64,
    /// Cancelled polls.
    pub cancelled: u64,
    /// Polarity violations.
    pub violated: u64,
    /// Polls ended by end of stream.
    pub ended: u64,
    /// Polls running at snapshot time.
    pub active: u64,
}

/// Metrics for log followers.
#[derive(Debug, Default)]
pub struct FollowerMetrics {
    /// Successful connections, including reconnects.
    pub connections: Counter,
    /// Reconnection attempts.
    pub reconnects: Counter,
    /// Failed connection attempts and stream errors.
    pub errors: Counter,
    /// Lines appended to buffers.
    pub lines: Counter,
    /// Bytes appended to buffers.
    pub bytes: Counter,
    /// Followers with a live background task.
    pub active: Gauge,
}

impl FollowerMetrics {
    /// Create new follower metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FollowerSnapshot {
        FollowerSnapshot {
            connections: self.connections.get(),
            reconnects: self.reconnects.get(),
            errors: self.errors.get(),
            lines: self.lines.get(),
            bytes: self.bytes.get(),
            active: self.active.get(),
        }
    }
}

/// Snapshot of [`FollowerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowerSnapshot {
    /// Successful connections.
    pub connections: u64,
    /// Reconnection attempts.
    pub reconnects: u64,
    /// Connection and stream errors.
    pub errors: u64,
    /// Lines appended.
    pub lines: u64,
    /// Bytes appended.
    pub bytes: u64,
    /// Live followers.
    pub active: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_basic() {
        let counter = Counter::new();
        counter.inc();
        counter.add(5);
        assert_eq!(counter.get(), 6);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn gauge_does_not_underflow() {
        let gauge = Gauge::new();
        gauge.dec();
        assert_eq!(gauge.get(), 0);
        gauge.set(2);
        gauge.inc();
        gauge.dec();
        assert_eq!(gauge.get(), 2);
    }

    #[test]
    fn histogram_sums_values() {
        let histogram = Histogram::with_buckets(vec![0.1, 1.0]);
        histogram.observe(0.05);
        histogram.observe(0.5);
        histogram.observe(2.0);
        assert_eq!(histogram.count(), 3);
        assert!((histogram.sum() - 2.55).abs() < 1e-9);
        assert_eq!(histogram.bucket_counts(), vec![1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_metrics_track_outcomes() {
        let metrics = PollMetrics::new();
        let timer = metrics.poll_started();
        metrics.attempts.add(3);
        tokio::time::sleep(Duration::from_millis(300)).await;
        metrics.poll_finished(PollOutcome::Succeeded, timer);
        let timer = metrics.poll_started();
        tokio::time::sleep(Duration::from_millis(500)).await;
        metrics.poll_finished(PollOutcome::PolarityViolated, timer);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.polls, 2);
        assert_eq!(snapshot.attempts, 3);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.violated, 1);
        assert_eq!(snapshot.active, 0);
        assert_eq!(metrics.duration.count(), 2);
        assert!((metrics.duration.sum() - 0.8).abs() < 1e-9);
    }
}
