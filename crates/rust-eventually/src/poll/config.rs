//! Poll cadence and budget configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EventuallyError, Result};

/// Default budget for eventually polls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default interval for eventually polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Default window for consistently polls.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Default interval for consistently polls.
pub const DEFAULT_CONSISTENTLY_INTERVAL: Duration = Duration::from_millis(10);

/// Which way a poll is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Succeed on the first true observation.
    #[default]
    Eventually,
    /// Fail on the first false observation; succeed if the window closes without one.
    Consistently,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eventually => f.write_str("eventually"),
            Self::Consistently => f.write_str("consistently"),
        }
    }
}

/// How a consistently poll treats a failed producer call.
///
/// Eventually polls always retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPolicy {
    /// The first failed producer call is a polarity violation.
    #[default]
    Fail,
    /// Keep polling through failed calls. A window with any failed call is
    /// inconclusive and ends `TimedOut`, never `Succeeded`.
    Retry,
}

/// Configuration for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Polarity of the poll.
    pub polarity: Polarity,
    /// Time between attempt starts.
    pub interval: Duration,
    /// Total budget when polling eventually.
    pub timeout: Duration,
    /// Total window when polling consistently.
    pub window: Duration,
    /// Treatment of producer failures in consistently polls.
    pub transport_policy: TransportPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::eventually(DEFAULT_TIMEOUT, DEFAULT_INTERVAL)
    }
}

impl PollConfig {
    /// An eventually configuration.
    #[must_use]
    pub const fn eventually(timeout: Duration, interval: Duration) -> Self {
        Self {
            polarity: Polarity::Eventually,
            interval,
            timeout,
            window: DEFAULT_WINDOW,
            transport_policy: TransportPolicy::Fail,
        }
    }

    /// A consistently configuration.
    #[must_use]
    pub const fn consistently(window: Duration, interval: Duration) -> Self {
        Self {
            polarity: Polarity::Consistently,
            interval,
            timeout: DEFAULT_TIMEOUT,
            window,
            transport_policy: TransportPolicy::Fail,
        }
    }

    /// Set the polarity.
    #[must_use]
    pub const fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the interval.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the eventually timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the consistently window.
    #[must_use]
    pub const fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the transport policy.
    #[must_use]
    pub const fn transport_policy(mut self, policy: TransportPolicy) -> Self {
        self.transport_policy = policy;
        self
    }

    /// The budget that applies to this configuration's polarity.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        match self.polarity {
            Polarity::Eventually => self.timeout,
            Polarity::Consistently => self.window,
        }
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] for a zero interval or a
    /// budget shorter than the interval.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(EventuallyError::invalid_config("interval must be greater than zero"));
        }
        let budget = self.budget();
        if budget < self.interval {
            let name = match self.polarity {
                Polarity::Eventually => "timeout",
                Polarity::Consistently => "window",
            };
            return Err(EventuallyError::invalid_config(format!(
                "{name} ({budget:?}) must be at least the interval ({:?})",
                self.interval
            )));
        }
        Ok(())
    }
}
