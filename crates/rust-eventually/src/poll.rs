//! Condition polling.
//!
//! A poll repeatedly asks a [`Producer`] for an observation and checks it
//! with a [`Condition`]. Eventually polls succeed on the first true
//! observation; consistently polls fail on the first false one. Every
//! terminal outcome is returned as a [`PollResult`].

mod condition;
mod config;
mod log;
mod poller;
mod producer;
mod result;

pub use condition::{Check, Condition, Contains, Evidence, Lacks, contains, lacks};
pub use config::{
    DEFAULT_CONSISTENTLY_INTERVAL, DEFAULT_INTERVAL, DEFAULT_TIMEOUT, DEFAULT_WINDOW, Polarity,
    PollConfig, TransportPolicy,
};
pub use log::LogReader;
pub use poller::{ConditionPoller, poll_consistently, poll_eventually};
pub use producer::{BufferWindow, FromFn, Producer, from_fn};
pub use result::{PollOutcome, PollResult};
