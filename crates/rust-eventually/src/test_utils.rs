//! Test utilities for rust-eventually.
//!
//! Scripted stand-ins for remote log sources and poll producers, plus
//! assertion helpers for poll results.

mod assertions;
mod scripted_producer;
mod scripted_source;

pub use assertions::PollAssertions;
pub use scripted_producer::{CallLog, ScriptedProducer};
pub use scripted_source::{ScriptStats, ScriptedSession, ScriptedSource};
