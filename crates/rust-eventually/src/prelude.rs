//! Convenient re-exports for common rust-eventually usage.
//!
//! # Example
//!
//! ```ignore
//! use rust_eventually::prelude::*;
//!
//! let follower = LogFollower::start(source, FollowerConfig::default());
//! let mut logs = follower.reader();
//! let poller = ConditionPoller::new(poll_config!(eventually 2 s every 50 ms));
//! logs.eventually_says("ready", &poller).await?.into_result()?;
//! ```

// Error handling
pub use crate::error::{EventuallyError, Result, TransportError, TransportErrorKind};

// Buffers
pub use crate::buffer::{Cursor, EndOfStream, StreamBuffer, StreamWriter};

// Matching
pub use crate::matching::{Extractor, Pattern, PatternMatch};

// Polling
pub use crate::poll::{
    BufferWindow, Check, Condition, ConditionPoller, LogReader, Polarity, PollConfig,
    PollOutcome, PollResult, Producer, TransportPolicy, contains, from_fn, lacks,
};

// Following
pub use crate::follow::{
    ChannelSource, CommandSource, LogFollower, LogSink, LogSource, ReconnectPolicy, TcpSource,
    follow,
};

// Configuration
pub use crate::config::{FollowerConfig, Settings};

// Probes
pub use crate::probe::CommandProbe;

// Macros (re-exported from rust-eventually-macros)
pub use crate::{capture, pattern, poll_config};

// Sync wrapper
pub use crate::sync::{BlockingPoller, block_on};
