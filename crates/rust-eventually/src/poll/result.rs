//! Terminal poll outcomes.

use std::fmt;
use std::time::Duration;

use super::condition::Evidence;
use super::config::Polarity;
use crate::buffer::EndOfStream;
use crate::error::{EventuallyError, Result, TransportError};

/// How a poll ended. Exactly one outcome is reported per poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollOutcome {
    /// The condition was decided in the caller's favour.
    Succeeded,
    /// The budget ran out before an eventually condition held, or a
    /// consistently window closed without a conclusive observation: none
    /// was true, or a retried producer call failed.
    TimedOut,
    /// The caller cancelled the poll.
    Cancelled,
    /// A consistently condition turned false.
    PolarityViolated,
    /// The observed stream failed, or ended before an eventually condition
    /// could hold.
    Ended,
}

impl PollOutcome {
    /// Check whether this outcome is a success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Succeeded => "succeeded",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
            Self::PolarityViolated => "polarity violated",
            Self::Ended => "stream ended",
        };
        f.write_str(s)
    }
}

/// Everything a poll observed, returned whatever the outcome.
#[derive(Debug, Clone)]
pub struct PollResult<T> {
    /// How the poll ended.
    pub outcome: PollOutcome,
    /// Polarity the poll ran with.
    pub polarity: Polarity,
    /// The timeout or window that applied.
    pub budget: Duration,
    /// The last successfully produced observation.
    pub last: Option<T>,
    /// Evidence from the deciding check.
    pub evidence: Option<Evidence>,
    /// The most recent producer failure.
    pub last_error: Option<TransportError>,
    /// Why the observed stream ended, for [`PollOutcome::Ended`].
    pub end_of_stream: Option<EndOfStream>,
    /// The 1-based attempt that violated a consistently condition.
    pub failed_attempt: Option<u32>,
    /// Time from poll start to the outcome.
    pub elapsed: Duration,
    /// Attempts started.
    pub attempts: u32,
    /// Attempts whose producer failed.
    pub transport_errors: u32,
    /// Caller supplied description.
    pub description: Option<String>,
}

impl<T> PollResult<T> {
    /// Check whether the poll succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Map the observation type.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollResult<U> {
        PollResult {
            outcome: self.outcome,
            polarity: self.polarity,
            budget: self.budget,
            last: self.last.map(f),
            evidence: self.evidence,
            last_error: self.last_error,
            end_of_stream: self.end_of_stream,
            failed_attempt: self.failed_attempt,
            elapsed: self.elapsed,
            attempts: self.attempts,
            transport_errors: self.transport_errors,
            description: self.description,
        }
    }

    /// Convert a non-success outcome into an error, rendering observations with `render`.
    ///
    /// # Errors
    ///
    /// Returns the [`EventuallyError`] matching the outcome unless it is
    /// [`PollOutcome::Succeeded`].
    pub fn into_result_with(self, render: impl FnOnce(&T) -> String) -> Result<Self> {
        let buffer = match (&self.last, &self.last_error) {
            (Some(last), _) => render(last),
            (None, Some(err)) => format!("(no observation; last transport error: {err})"),
            (None, None) => String::new(),
        };
        let err = match self.outcome {
            PollOutcome::Succeeded => return Ok(self),
            PollOutcome::TimedOut => EventuallyError::Timeout {
                duration: self.budget,
                attempts: self.attempts,
                description: self.description,
                buffer,
            },
            PollOutcome::PolarityViolated => {
                let (matched, offset) = self
                    .evidence
                    .map_or((None, None), |e| (Some(e.text), e.offset));
                EventuallyError::PolarityViolated {
                    window: self.budget,
                    attempt: self.failed_attempt.unwrap_or(self.attempts),
                    matched,
                    offset,
                    description: self.description,
                    buffer,
                }
            }
            PollOutcome::Cancelled => EventuallyError::Cancelled {
                attempts: self.attempts,
                elapsed: self.elapsed,
            },
            PollOutcome::Ended => EventuallyError::StreamEnded {
                reason: self.end_of_stream.unwrap_or(EndOfStream::Closed),
                buffer,
            },
        };
        Err(err)
    }

    /// Convert a non-success outcome into an error.
    ///
    /// # Errors
    ///
    /// See [`PollResult::into_result_with`].
    pub fn into_result(self) -> Result<Self>
    where
        T: fmt::Display,
    {
        self.into_result_with(ToString::to_string)
    }
}
