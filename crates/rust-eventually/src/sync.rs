//! Blocking wrappers for synchronous test code.

use tokio::runtime::{Builder, Runtime};

use crate::config::FollowerConfig;
use crate::error::{EventuallyError, Result};
use crate::follow::{LogFollower, LogSource};
use crate::matching::Pattern;
use crate::poll::{Condition, ConditionPoller, LogReader, PollConfig, PollResult, Producer};

/// Runs polls and followers on a private current-thread runtime.
///
/// Followers started here only make progress while one of the blocking
/// calls is running.
pub struct BlockingPoller {
    runtime: Runtime,
    poller: ConditionPoller,
}

impl BlockingPoller {
    /// Create a blocking poller.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created.
    pub fn new(config: PollConfig) -> Result<Self> {
        Self::with_poller(ConditionPoller::new(config))
    }

    /// Wrap an existing poller.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created.
    pub fn with_poller(poller: ConditionPoller) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EventuallyError::io_context("creating tokio runtime", e))?;
        Ok(Self { runtime, poller })
    }

    /// The wrapped poller.
    #[must_use]
    pub const fn poller(&self) -> &ConditionPoller {
        &self.poller
    }

    /// Poll with the configured polarity.
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid configuration.
    pub fn poll<P, C>(&self, producer: P, condition: C) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        self.runtime.block_on(self.poller.poll(producer, condition))
    }

    /// Poll until the condition holds.
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid configuration.
    pub fn eventually<P, C>(&self, producer: P, condition: C) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        self.runtime.block_on(self.poller.eventually(producer, condition))
    }

    /// Require the condition for the whole window.
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid configuration.
    pub fn consistently<P, C>(&self, producer: P, condition: C) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        self.runtime.block_on(self.poller.consistently(producer, condition))
    }

    /// Start a follower on this poller's runtime.
    pub fn follow<S: LogSource>(&self, source: S, config: FollowerConfig) -> LogFollower {
        let _guard = self.runtime.enter();
        LogFollower::start(source, config)
    }

    /// Stop a follower started with [`BlockingPoller::follow`].
    pub fn stop(&self, follower: &mut LogFollower) {
        self.runtime.block_on(follower.stop());
    }

    /// Blocking form of [`LogReader::eventually_says`].
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid configuration.
    pub fn eventually_says(
        &self,
        reader: &mut LogReader,
        pattern: impl Into<Pattern>,
    ) -> Result<PollResult<String>> {
        self.runtime.block_on(reader.eventually_says(pattern, &self.poller))
    }

    /// Blocking form of [`LogReader::never_says`].
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid configuration.
    pub fn never_says(
        &self,
        reader: &LogReader,
        pattern: impl Into<Pattern>,
    ) -> Result<PollResult<String>> {
        self.runtime.block_on(reader.never_says(pattern, &self.poller))
    }

    /// Run any future on this poller's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl std::fmt::Debug for BlockingPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingPoller")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

/// Run a future to completion on a fresh current-thread runtime.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EventuallyError::io_context("creating tokio runtime for block_on", e))?;
    Ok(runtime.block_on(future))
}
