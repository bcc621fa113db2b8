//! Configuration for pollers, followers and logging.
//!
//! [`Settings`] loads in three layers: built-in defaults, then an optional
//! TOML or JSON file named by `EVENTUALLY_CONFIG`, then individual
//! `EVENTUALLY_*` environment variables.

pub mod env;
pub mod file;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use env::EnvConfig;
pub use file::{ConfigFormat, FileConfig};

use crate::error::{EventuallyError, Result};
use crate::follow::ReconnectPolicy;
use crate::poll::{
    DEFAULT_CONSISTENTLY_INTERVAL, DEFAULT_INTERVAL, DEFAULT_TIMEOUT, DEFAULT_WINDOW, Polarity,
    PollConfig, TransportPolicy,
};

/// Default maximum line length for followers (64 KiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Default time a follower's background task gets to exit on stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Defaults applied to polls that do not specify their own cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDefaults {
    /// Eventually budget.
    pub timeout: Duration,
    /// Eventually interval.
    pub interval: Duration,
    /// Consistently window.
    pub window: Duration,
    /// Consistently interval.
    pub consistently_interval: Duration,
    /// Transport policy for consistently polls.
    pub transport_policy: TransportPolicy,
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            window: DEFAULT_WINDOW,
            consistently_interval: DEFAULT_CONSISTENTLY_INTERVAL,
            transport_policy: TransportPolicy::Fail,
        }
    }
}

impl PollDefaults {
    /// A poll configuration for `polarity`.
    #[must_use]
    pub const fn poll_config(&self, polarity: Polarity) -> PollConfig {
        let config = match polarity {
            Polarity::Eventually => PollConfig::eventually(self.timeout, self.interval),
            Polarity::Consistently => {
                PollConfig::consistently(self.window, self.consistently_interval)
            }
        };
        config
            .timeout(self.timeout)
            .window(self.window)
            .transport_policy(self.transport_policy)
    }

    /// The eventually configuration.
    #[must_use]
    pub const fn eventually(&self) -> PollConfig {
        self.poll_config(Polarity::Eventually)
    }

    /// The consistently configuration.
    #[must_use]
    pub const fn consistently(&self) -> PollConfig {
        self.poll_config(Polarity::Consistently)
    }

    /// Check both configurations.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] if either is invalid.
    pub fn validate(&self) -> Result<()> {
        self.eventually().validate()?;
        self.consistently().validate()
    }
}

/// Configuration for a log follower.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowerConfig {
    /// Longest line appended in one piece; longer lines are split.
    pub max_line_length: usize,
    /// How long `stop` waits for the background task before aborting it.
    pub stop_timeout: Duration,
    /// What to do when the connection drops.
    pub reconnect: ReconnectPolicy,
    /// Strip a trailing `\r` from each line.
    pub strip_carriage_returns: bool,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            reconnect: ReconnectPolicy::None,
            strip_carriage_returns: true,
        }
    }
}

impl FollowerConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum line length.
    #[must_use]
    pub const fn max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Set the stop timeout.
    #[must_use]
    pub const fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set whether trailing carriage returns are stripped.
    #[must_use]
    pub const fn strip_carriage_returns(mut self, strip: bool) -> Self {
        self.strip_carriage_returns = strip;
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] for a zero line length.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length == 0 {
            return Err(EventuallyError::invalid_config(
                "max_line_length must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = EventuallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(EventuallyError::invalid_config(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `rust_eventually=debug`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

/// All settings, loaded in layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// Poll defaults.
    pub poll: PollDefaults,
    /// Follower configuration.
    pub follower: FollowerConfig,
    /// Logging configuration.
    pub logging: LogConfig,
}

impl Settings {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if a
    /// value is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&EnvConfig::default())
    }

    /// Load through an explicit environment reader.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_from(env: &EnvConfig) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(path) = env.get(env::vars::CONFIG) {
            file::load(Path::new(&path))?.apply(&mut settings);
        }
        settings.apply_env(env)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load defaults overlaid with one file, ignoring the environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut settings = Self::default();
        file::load(path)?.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] for unparsable values.
    pub fn apply_env(&mut self, env: &EnvConfig) -> Result<()> {
        use env::vars;

        if let Some(d) = env.duration_millis(vars::TIMEOUT_MS)? {
            self.poll.timeout = d;
        }
        if let Some(d) = env.duration_millis(vars::INTERVAL_MS)? {
            self.poll.interval = d;
        }
        if let Some(d) = env.duration_millis(vars::WINDOW_MS)? {
            self.poll.window = d;
        }
        if let Some(d) = env.duration_millis(vars::CONSISTENTLY_INTERVAL_MS)? {
            self.poll.consistently_interval = d;
        }
        if let Some(d) = env.duration_millis(vars::STOP_TIMEOUT_MS)? {
            self.follower.stop_timeout = d;
        }
        if let Some(filter) = env.get(vars::LOG) {
            self.logging.filter = filter;
        }
        if let Some(format) = env.get(vars::LOG_FORMAT) {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.poll.validate()?;
        self.follower.validate()
    }
}
