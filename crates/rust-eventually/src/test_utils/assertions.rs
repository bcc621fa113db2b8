//! Assertion helpers for poll results.

use std::fmt::Debug;

use crate::poll::{PollOutcome, PollResult};

/// Assertions on a [`PollResult`] that print the whole result on failure.
pub trait PollAssertions {
    /// The outcome under test.
    fn outcome(&self) -> PollOutcome;

    /// Assert a specific outcome.
    #[track_caller]
    fn assert_outcome(&self, expected: PollOutcome) -> &Self;

    /// Assert the poll succeeded.
    #[track_caller]
    fn assert_succeeded(&self) -> &Self {
        self.assert_outcome(PollOutcome::Succeeded)
    }

    /// Assert the poll timed out.
    #[track_caller]
    fn assert_timed_out(&self) -> &Self {
        self.assert_outcome(PollOutcome::TimedOut)
    }

    /// Assert the poll was cancelled.
    #[track_caller]
    fn assert_cancelled(&self) -> &Self {
        self.assert_outcome(PollOutcome::Cancelled)
    }

    /// Assert the observed stream ended.
    #[track_caller]
    fn assert_ended(&self) -> &Self {
        self.assert_outcome(PollOutcome::Ended)
    }

    /// Assert a consistently condition broke on the given 1-based attempt.
    #[track_caller]
    fn assert_violated_at(&self, attempt: u32) -> &Self;

    /// Assert the number of attempts started.
    #[track_caller]
    fn assert_attempts(&self, expected: u32) -> &Self;
}

impl<T: Debug> PollAssertions for PollResult<T> {
    fn outcome(&self) -> PollOutcome {
        self.outcome
    }

    fn assert_outcome(&self, expected: PollOutcome) -> &Self {
        assert_eq!(
            self.outcome, expected,
            "Expected poll to end {expected}, but got:\n{self:#?}"
        );
        self
    }

    fn assert_violated_at(&self, attempt: u32) -> &Self {
        self.assert_outcome(PollOutcome::PolarityViolated);
        assert_eq!(
            self.failed_attempt,
            Some(attempt),
            "Expected violation on attempt {attempt}, but got:\n{self:#?}"
        );
        self
    }

    fn assert_attempts(&self, expected: u32) -> &Self {
        assert_eq!(
            self.attempts, expected,
            "Expected {expected} attempts, but got:\n{self:#?}"
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::poll::{ConditionPoller, PollConfig};
    use crate::test_utils::ScriptedProducer;

    #[tokio::test(start_paused = true)]
    async fn chained_assertions() {
        let poller = ConditionPoller::new(PollConfig::eventually(
            Duration::from_millis(100),
            Duration::from_millis(10),
        ));
        let result = poller
            .eventually(ScriptedProducer::values([false, true]), |b: &bool| *b)
            .await
            .unwrap();
        result.assert_succeeded().assert_attempts(2);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "Expected poll to end timed out")]
    async fn mismatch_panics() {
        let poller = ConditionPoller::new(PollConfig::eventually(
            Duration::from_millis(100),
            Duration::from_millis(10),
        ));
        let result = poller
            .eventually(ScriptedProducer::values([true]), |b: &bool| *b)
            .await
            .unwrap();
        result.assert_timed_out();
    }
}
