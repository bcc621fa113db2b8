//! Reconnection policies for log followers.

use std::time::Duration;

/// What a follower does after its connection drops or fails to open.
///
/// Attempts are counted since the last connection that delivered data, so a
/// source that keeps accepting and immediately closing still runs out.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReconnectPolicy {
    /// Never reconnect; the first disconnect ends the stream.
    #[default]
    None,
    /// Fixed delay between attempts.
    Fixed {
        /// Delay before each attempt.
        delay: Duration,
        /// Maximum consecutive attempts.
        max_attempts: u32,
    },
    /// Exponential backoff.
    Exponential {
        /// Delay before the first attempt.
        initial_delay: Duration,
        /// Upper bound for any delay.
        max_delay: Duration,
        /// Growth factor per attempt.
        multiplier: f64,
        /// Maximum consecutive attempts.
        max_attempts: u32,
    },
}

impl ReconnectPolicy {
    /// Never reconnect.
    #[must_use]
    pub const fn none() -> Self {
        Self::None
    }

    /// Reconnect after a fixed delay.
    #[must_use]
    pub const fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self::Fixed {
            delay,
            max_attempts,
        }
    }

    /// Reconnect with exponential backoff capped at 30 seconds.
    #[must_use]
    pub const fn exponential(initial_delay: Duration, max_attempts: u32) -> Self {
        Self::Exponential {
            initial_delay,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based), or `None` to give up.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                delay,
                max_attempts,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::Exponential {
                initial_delay,
                max_delay,
                multiplier,
                max_attempts,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = initial_delay.as_secs_f64() * multiplier.powi(exponent);
                Some(Duration::try_from_secs_f64(secs).map_or(*max_delay, |d| d.min(*max_delay)))
            }
        }
    }

    /// Maximum consecutive reconnect attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Fixed { max_attempts, .. } | Self::Exponential { max_attempts, .. } => {
                *max_attempts
            }
        }
    }
}
