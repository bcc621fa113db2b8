//! A producer that replays scripted observations.

use std::collections::VecDeque;
use std::future::{Future, ready};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;

use crate::buffer::EndOfStream;
use crate::error::TransportError;
use crate::poll::Producer;

/// Replays a fixed sequence of observations, then repeats the last one.
///
/// Every call is timestamped on the Tokio clock so tests can check the
/// attempt schedule.
#[derive(Debug, Clone)]
pub struct ScriptedProducer<T> {
    script: VecDeque<Result<T, TransportError>>,
    last: Option<Result<T, TransportError>>,
    ends_with: Option<EndOfStream>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl<T: Clone> ScriptedProducer<T> {
    /// Replay `script`.
    pub fn new(script: impl IntoIterator<Item = Result<T, TransportError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            ends_with: None,
            calls: Arc::default(),
        }
    }

    /// Replay plain values.
    pub fn values(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(values.into_iter().map(Ok))
    }

    /// Report `end` as exhausted once the script has been consumed.
    #[must_use]
    pub fn ending(mut self, end: EndOfStream) -> Self {
        self.ends_with = Some(end);
        self
    }

    /// A handle that reads the call log after the producer moves into a poll.
    #[must_use]
    pub fn call_log(&self) -> CallLog {
        CallLog(Arc::clone(&self.calls))
    }

    fn next(&mut self) -> Result<T, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());
        if let Some(item) = self.script.pop_front() {
            self.last = Some(item.clone());
            return item;
        }
        self.last
            .clone()
            .unwrap_or_else(|| Err(TransportError::end_of_stream("empty script")))
    }
}

impl<T: Clone> Producer for ScriptedProducer<T> {
    type Output = T;

    fn produce(&mut self) -> impl Future<Output = Result<T, TransportError>> {
        ready(self.next())
    }

    fn exhausted(&self) -> Option<EndOfStream> {
        if self.script.is_empty() {
            self.ends_with.clone()
        } else {
            None
        }
    }
}

/// Read access to a [`ScriptedProducer`]'s calls.
#[derive(Debug, Clone)]
pub struct CallLog(Arc<Mutex<Vec<Instant>>>);

impl CallLog {
    /// Number of calls so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Call times relative to `start`.
    #[must_use]
    pub fn offsets_from(&self, start: Instant) -> Vec<std::time::Duration> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|t| t.saturating_duration_since(start))
            .collect()
    }
}
