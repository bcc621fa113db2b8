//! File-based configuration loading.
//!
//! ```toml
//! [poll]
//! timeout_ms = 2000
//! interval_ms = 50
//! window_ms = 500
//! transport_policy = "retry"
//!
//! [follower]
//! max_line_length = 65536
//! stop_timeout_ms = 5000
//! reconnect = { strategy = "fixed", delay_ms = 200, max_attempts = 3 }
//!
//! [logging]
//! filter = "rust_eventually=debug"
//! format = "json"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::{LogFormat, Settings};
use crate::error::{EventuallyError, Result};
use crate::follow::ReconnectPolicy;
use crate::poll::TransportPolicy;

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// The on-disk shape of a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `[poll]` section.
    pub poll: PollSection,
    /// `[follower]` section.
    pub follower: FollowerSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[poll]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSection {
    /// Eventually budget.
    pub timeout_ms: Option<u64>,
    /// Eventually interval.
    pub interval_ms: Option<u64>,
    /// Consistently window.
    pub window_ms: Option<u64>,
    /// Consistently interval.
    pub consistently_interval_ms: Option<u64>,
    /// Transport policy for consistently polls.
    pub transport_policy: Option<TransportPolicy>,
}

/// `[follower]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FollowerSection {
    /// Maximum line length.
    pub max_line_length: Option<usize>,
    /// Stop timeout.
    pub stop_timeout_ms: Option<u64>,
    /// Strip trailing carriage returns.
    pub strip_carriage_returns: Option<bool>,
    /// Reconnect policy.
    pub reconnect: Option<ReconnectSection>,
}

/// Reconnect policy as written in a file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ReconnectSection {
    /// Never reconnect.
    None,
    /// Fixed delay.
    Fixed {
        /// Delay before each attempt.
        delay_ms: u64,
        /// Maximum consecutive attempts.
        max_attempts: u32,
    },
    /// Exponential backoff.
    Exponential {
        /// Delay before the first attempt.
        initial_delay_ms: u64,
        /// Cap on any delay.
        #[serde(default = "default_max_delay_ms")]
        max_delay_ms: u64,
        /// Growth factor.
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Maximum consecutive attempts.
        max_attempts: u32,
    },
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_multiplier() -> f64 {
    2.0
}

impl From<ReconnectSection> for ReconnectPolicy {
    fn from(section: ReconnectSection) -> Self {
        match section {
            ReconnectSection::None => Self::None,
            ReconnectSection::Fixed {
                delay_ms,
                max_attempts,
            } => Self::fixed(Duration::from_millis(delay_ms), max_attempts),
            ReconnectSection::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                max_attempts,
            } => Self::Exponential {
                initial_delay: Duration::from_millis(initial_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
                multiplier,
                max_attempts,
            },
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Tracing filter directive.
    pub filter: Option<String>,
    /// Output format.
    pub format: Option<LogFormat>,
}

impl FileConfig {
    /// Overlay the values present in this file onto `settings`.
    pub fn apply(self, settings: &mut Settings) {
        let poll = &mut settings.poll;
        if let Some(ms) = self.poll.timeout_ms {
            poll.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll.interval_ms {
            poll.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll.window_ms {
            poll.window = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll.consistently_interval_ms {
            poll.consistently_interval = Duration::from_millis(ms);
        }
        if let Some(policy) = self.poll.transport_policy {
            poll.transport_policy = policy;
        }

        let follower = &mut settings.follower;
        if let Some(length) = self.follower.max_line_length {
            follower.max_line_length = length;
        }
        if let Some(ms) = self.follower.stop_timeout_ms {
            follower.stop_timeout = Duration::from_millis(ms);
        }
        if let Some(strip) = self.follower.strip_carriage_returns {
            follower.strip_carriage_returns = strip;
        }
        if let Some(reconnect) = self.follower.reconnect {
            follower.reconnect = reconnect.into();
        }

        if let Some(filter) = self.logging.filter {
            settings.logging.filter = filter;
        }
        if let Some(format) = self.logging.format {
            settings.logging.format = format;
        }
    }
}

/// Parse config text in the given format.
///
/// # Errors
///
/// Returns [`EventuallyError::ConfigParse`] for malformed input or unknown keys.
pub fn parse_str(content: &str, format: ConfigFormat) -> Result<FileConfig> {
    let parsed = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| EventuallyError::ConfigParse {
        format: format.name(),
        message,
    })
}

/// Load a config file, choosing the format by extension.
///
/// # Errors
///
/// Returns an error if the extension is unknown, the file cannot be read, or
/// it does not parse.
pub fn load(path: &Path) -> Result<FileConfig> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        EventuallyError::invalid_config(format!(
            "unknown config format for {} (expected .toml or .json)",
            path.display()
        ))
    })?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        EventuallyError::io_context(format!("reading config file {}", path.display()), e)
    })?;
    parse_str(&content, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overlays_defaults() {
        let file = parse_str(
            r#"
            [poll]
            timeout_ms = 2000
            transport_policy = "retry"

            [follower]
            reconnect = { strategy = "fixed", delay_ms = 200, max_attempts = 3 }

            [logging]
            format = "json"
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let mut settings = Settings::default();
        file.apply(&mut settings);
        assert_eq!(settings.poll.timeout, Duration::from_secs(2));
        assert_eq!(settings.poll.interval, Duration::from_millis(10));
        assert_eq!(settings.poll.transport_policy, TransportPolicy::Retry);
        assert_eq!(
            settings.follower.reconnect,
            ReconnectPolicy::fixed(Duration::from_millis(200), 3)
        );
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn json_exponential_defaults() {
        let file = parse_str(
            r#"{"follower": {"reconnect": {"strategy": "exponential", "initial_delay_ms": 100, "max_attempts": 5}}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let mut settings = Settings::default();
        file.apply(&mut settings);
        assert_eq!(
            settings.follower.reconnect,
            ReconnectPolicy::Exponential {
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                max_attempts: 5,
            }
        );
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = parse_str("[poll]\ntimeout = 5\n", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, EventuallyError::ConfigParse { format: "toml", .. }));
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("eventually.TOML")),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("eventually.yaml")), None);
    }
}
