//! `tracing-subscriber` setup.
//!
//! Library code only emits `tracing` events; test binaries that want to see
//! them call [`init`] once.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogConfig, LogFormat};
use crate::error::{EventuallyError, Result};

/// Install a global subscriber for `config`.
///
/// `RUST_LOG`, when set and valid, takes precedence over the configured
/// filter. Calling this again after a subscriber is installed does nothing.
///
/// # Errors
///
/// Returns [`EventuallyError::InvalidConfig`] if the configured filter does
/// not parse.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
    Ok(())
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| {
        EventuallyError::invalid_config(format!("invalid log filter '{}': {e}", config.filter))
    })
}
