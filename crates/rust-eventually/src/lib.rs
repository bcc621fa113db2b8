//! rust-eventually: Eventually/consistently polling and live log matching
//!
//! This crate provides the asynchronous assertion primitives acceptance
//! tests need against a remote system: follow a log stream into a buffer,
//! then poll it (or any other probe) until a condition holds, or require a
//! condition to keep holding for a window.
//!
//! # Features
//!
//! - **Append-only stream buffers** with cursors and end-of-stream markers
//! - **Log following** from commands, TCP endpoints or in-process channels,
//!   with optional reconnection
//! - **Eventually/consistently polling** with cancellation and a single
//!   terminal outcome per poll
//! - **Cursor-scoped log assertions** that must be satisfied in stream order
//! - **Single-group extraction** of correlation identifiers
//! - **Compile-time checked** patterns, extractors and poll configs
//! - **Subscriber setup** for `tracing` (feature: `logging`)
//! - **Scripted sources and producers** for testing (feature: `test-utils`)
//!
//! # Example
//!
//! ```ignore
//! use rust_eventually::prelude::*;
//!
//! #[tokio::test]
//! async fn rate_limit_is_enforced() -> Result<()> {
//!     let follower = LogFollower::start(
//!         CommandSource::new("cf").args(["logs", "spewer"]),
//!         FollowerConfig::default(),
//!     );
//!     let mut logs = follower.reader();
//!
//!     let poller = ConditionPoller::new(poll_config!(eventually 2 s every 100 ms));
//!     logs.eventually_says("app instance exceeded log rate limit", &poller)
//!         .await?
//!         .into_result()?;
//!
//!     let quiet = ConditionPoller::new(poll_config!(consistently 1 s every 100 ms));
//!     logs.never_says("11111", &quiet).await?.into_result()?;
//!     Ok(())
//! }
//! ```

// Lets the macros' `::rust_eventually` paths resolve inside this crate.
extern crate self as rust_eventually;

// Re-export macros
pub use rust_eventually_macros::{capture, pattern, poll_config};

// Core types
pub mod buffer;
pub mod config;
pub mod error;
pub mod prelude;

// Engine
pub mod follow;
pub mod matching;
pub mod poll;
pub mod probe;
pub mod sync;
pub mod util;

// Observability
pub mod metrics;

/// `tracing-subscriber` setup.
#[cfg(feature = "logging")]
pub mod logging;

pub use buffer::{Chunk, Cursor, EndOfStream, StreamBuffer, StreamWriter};
pub use config::{EnvConfig, FollowerConfig, LogConfig, LogFormat, PollDefaults, Settings};
pub use error::{EventuallyError, Result, TransportError, TransportErrorKind};
pub use follow::{
    ChannelSource, CommandSource, FrameStream, LineDecoder, LogFollower, LogSink, LogSource,
    ReconnectPolicy, TcpSource, follow,
};
pub use matching::{
    CacheStats, CompiledRegex, Extractor, GLOBAL_CACHE, Pattern, PatternMatch, RegexCache,
    find_first,
};
pub use metrics::{Counter, FollowerMetrics, Gauge, Histogram, PollMetrics, Timer};
pub use poll::{
    BufferWindow, Check, Condition, ConditionPoller, Evidence, LogReader, Polarity, PollConfig,
    PollOutcome, PollResult, Producer, TransportPolicy, from_fn, poll_consistently,
    poll_eventually,
};
pub use probe::CommandProbe;
pub use sync::{BlockingPoller, block_on};
pub use util::{Deadline, TimeoutExt};

// Test utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{
    CallLog, PollAssertions, ScriptStats, ScriptedProducer, ScriptedSession, ScriptedSource,
};
