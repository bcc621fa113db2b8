//! Environment-based configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EventuallyError, Result};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "EVENTUALLY";

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable reader.
///
/// Reads go through a lookup function so tests can supply a map instead of
/// mutating the process environment.
#[derive(Clone)]
pub struct EnvConfig {
    prefix: String,
    lookup: Lookup,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfig")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl EnvConfig {
    /// Read the process environment with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Read through a custom lookup function.
    pub fn with_lookup<F>(prefix: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            prefix: prefix.into(),
            lookup: Arc::new(lookup),
        }
    }

    /// Read from a fixed map of full variable names.
    #[must_use]
    pub fn from_map(prefix: impl Into<String>, vars: HashMap<String, String>) -> Self {
        Self::with_lookup(prefix, move |name| vars.get(name).cloned())
    }

    /// Build the full environment variable name.
    #[must_use]
    pub fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value; empty values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.var_name(name)).filter(|v| !v.trim().is_empty())
    }

    /// Get a parsed value.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] if the variable is set but
    /// does not parse.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    EventuallyError::invalid_config(format!(
                        "{}: cannot parse '{raw}'",
                        self.var_name(name)
                    ))
                })
            })
            .transpose()
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a duration in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`EventuallyError::InvalidConfig`] for a non-numeric value.
    pub fn duration_millis(&self, name: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_millis))
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Variable names, without the prefix.
pub mod vars {
    /// Eventually timeout in milliseconds.
    pub const TIMEOUT_MS: &str = "TIMEOUT_MS";
    /// Eventually interval in milliseconds.
    pub const INTERVAL_MS: &str = "INTERVAL_MS";
    /// Consistently window in milliseconds.
    pub const WINDOW_MS: &str = "WINDOW_MS";
    /// Consistently interval in milliseconds.
    pub const CONSISTENTLY_INTERVAL_MS: &str = "CONSISTENTLY_INTERVAL_MS";
    /// Follower stop timeout in milliseconds.
    pub const STOP_TIMEOUT_MS: &str = "STOP_TIMEOUT_MS";
    /// Tracing filter directive.
    pub const LOG: &str = "LOG";
    /// Log format: pretty, compact or json.
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    /// Path of a TOML or JSON config file.
    pub const CONFIG: &str = "CONFIG";
}
