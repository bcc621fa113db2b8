//! Error types for rust-eventually.
//!
//! This module defines all error types used throughout the library.
//! Terminal poll outcomes convert into errors that carry the last observed
//! content, so a failed assertion shows what the stream actually contained.

use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::buffer::EndOfStream;

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Context lines to show before/after truncation point.
const CONTEXT_LINES: usize = 3;

/// Format buffer content for display, truncating if necessary.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let buffer_len = buffer.len();
    let lines: Vec<&str> = buffer.lines().collect();
    let total_lines = lines.len();

    if buffer_len <= MAX_BUFFER_DISPLAY || total_lines <= CONTEXT_LINES * 2 {
        return format!(
            "┌─ buffer ({buffer_len} bytes, {total_lines} lines) ─────────────\n│ {}\n└────────────────────────────────────────",
            lines.join("\n│ ")
        );
    }

    // Large buffer: the newest lines are the interesting ones for a live stream
    let tail_lines = &lines[total_lines - CONTEXT_LINES * 2..];
    let hidden = total_lines - tail_lines.len();

    format!(
        "┌─ buffer ({buffer_len} bytes, {total_lines} lines) ─────────────\n│ ... ({hidden} lines hidden)\n│ {}\n└────────────────────────────────────────",
        tail_lines.join("\n│ ")
    )
}

fn format_description(description: Option<&str>) -> String {
    description.map_or_else(String::new, |d| format!("{d}\n\n"))
}

fn format_timeout_error(
    duration: Duration,
    attempts: u32,
    description: Option<&str>,
    buffer: &str,
) -> String {
    format!(
        "{}condition not satisfied within {duration:?} ({attempts} attempts)\n\
         \n\
         {}\n\
         \n\
         Tip: Check that:\n\
         - The expected content is actually produced by the target\n\
         - The pattern is correct (regex special chars may need escaping)\n\
         - The timeout leaves room for the target to become consistent",
        format_description(description),
        format_buffer_snippet(buffer)
    )
}

fn format_violation_error(
    window: Duration,
    attempt: u32,
    matched: Option<&str>,
    offset: Option<usize>,
    description: Option<&str>,
    buffer: &str,
) -> String {
    let evidence = match (matched, offset) {
        (Some(m), Some(o)) => format!("Offending match: '{m}' at offset {o}\n\n"),
        (Some(m), None) => format!("Offending observation: '{m}'\n\n"),
        _ => String::new(),
    };
    format!(
        "{}condition stopped holding on attempt {attempt} of a {window:?} window\n\
         \n\
         {evidence}{}",
        format_description(description),
        format_buffer_snippet(buffer)
    )
}

fn format_stream_ended_error(reason: &EndOfStream, buffer: &str) -> String {
    format!(
        "stream ended before the condition could be decided: {reason}\n\
         \n\
         {}\n\
         \n\
         Tip: The log source closed; no further content will arrive.",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for rust-eventually operations.
#[derive(Debug, Error)]
pub enum EventuallyError {
    /// A producer or log source could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An extraction was requested with a pattern of the wrong capture arity.
    #[error("pattern '{pattern}' has {groups} capture groups; extraction requires exactly one")]
    PatternContract {
        /// The offending pattern.
        pattern: String,
        /// Number of capture groups the pattern actually has.
        groups: usize,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid configuration values.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// An eventually poll ran out of time.
    #[error("{}", format_timeout_error(*duration, *attempts, description.as_deref(), buffer))]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
        /// Attempts made before giving up.
        attempts: u32,
        /// Caller supplied description of the assertion.
        description: Option<String>,
        /// Last observed content.
        buffer: String,
    },

    /// A consistently poll observed the condition turning false.
    #[error("{}", format_violation_error(*window, *attempt, matched.as_deref(), *offset, description.as_deref(), buffer))]
    PolarityViolated {
        /// The window that was being held.
        window: Duration,
        /// The attempt (1-based) that failed.
        attempt: u32,
        /// The offending match, if the condition reported one.
        matched: Option<String>,
        /// Offset of the offending match in the stream.
        offset: Option<usize>,
        /// Caller supplied description of the assertion.
        description: Option<String>,
        /// Content observed on the failing attempt.
        buffer: String,
    },

    /// The poll was cancelled by the caller.
    #[error("poll cancelled after {attempts} attempts ({elapsed:?})")]
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
    },

    /// The observed stream ended and the condition can no longer change.
    #[error("{}", format_stream_ended_error(reason, buffer))]
    StreamEnded {
        /// Why the stream ended.
        reason: EndOfStream,
        /// Final content.
        buffer: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse {format} configuration: {message}")]
    ConfigParse {
        /// The file format (toml, json).
        format: &'static str,
        /// Parser message.
        message: String,
    },
}

/// Result type alias for rust-eventually operations.
pub type Result<T> = std::result::Result<T, EventuallyError>;

impl EventuallyError {
    /// Create a pattern contract error.
    pub fn pattern_contract(pattern: impl Into<String>, groups: usize) -> Self {
        Self::PatternContract {
            pattern: pattern.into(),
            groups,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is a polarity violation.
    #[must_use]
    pub const fn is_violation(&self) -> bool {
        matches!(self, Self::PolarityViolated { .. })
    }

    /// Check if this error is a caller bug rather than an environmental failure.
    #[must_use]
    pub const fn is_contract(&self) -> bool {
        matches!(
            self,
            Self::PatternContract { .. } | Self::Regex(_) | Self::InvalidConfig { .. }
        )
    }

    /// Get the buffer contents if this error contains them.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. }
            | Self::PolarityViolated { buffer, .. }
            | Self::StreamEnded { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}

/// Classification of a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The remote end could not be reached or spawned.
    Unreachable,
    /// The remote end answered with a failure status (exit code, HTTP status).
    Status(i32),
    /// An I/O error while talking to the remote end.
    Io,
    /// The probe exceeded its own time limit.
    Timeout,
    /// The log stream has ended; no more content will arrive.
    EndOfStream,
}

/// A failure to obtain an observation from a producer or log source.
///
/// Eventually polls retry transport errors as non-matches. Consistently polls
/// treat them as a false observation unless their policy says to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Create a transport error of the given kind.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The remote end could not be reached.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unreachable, message)
    }

    /// The remote end reported a failure status.
    pub fn status(code: i32, message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status(code), message)
    }

    /// The probe timed out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// The stream has ended.
    pub fn end_of_stream(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::EndOfStream, message)
    }

    /// The failure classification.
    #[must_use]
    pub const fn kind(&self) -> &TransportErrorKind {
        &self.kind
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TransportErrorKind::Unreachable => write!(f, "unreachable: {}", self.message),
            TransportErrorKind::Status(code) => write!(f, "status {code}: {}", self.message),
            TransportErrorKind::Io => write!(f, "i/o: {}", self.message),
            TransportErrorKind::Timeout => write!(f, "timed out: {}", self.message),
            TransportErrorKind::EndOfStream => write!(f, "end of stream: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::NotFound
            | std::io::ErrorKind::AddrNotAvailable => TransportErrorKind::Unreachable,
            std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<String> for TransportError {
    fn from(message: String) -> Self {
        Self::new(TransportErrorKind::Io, message)
    }
}

impl From<&str> for TransportError {
    fn from(message: &str) -> Self {
        Self::new(TransportErrorKind::Io, message)
    }
}

impl From<Infallible> for TransportError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
