//! The eventually/consistently retry engine.

use std::sync::Arc;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::condition::{Condition, Evidence};
use super::config::{Polarity, PollConfig, TransportPolicy};
use super::producer::Producer;
use super::result::{PollOutcome, PollResult};
use crate::buffer::EndOfStream;
use crate::error::{Result, TransportErrorKind};
use crate::metrics::PollMetrics;
use crate::util::Deadline;

/// Runs polls on the calling task.
///
/// Attempt `n` is scheduled `n * interval` after the poll starts; the first
/// attempt runs immediately. If an attempt overruns its slot the next one
/// starts as soon as it returns. An attempt whose slot is not strictly before
/// the deadline is skipped, never started and abandoned.
///
/// ```rust
/// use std::time::Duration;
/// use rust_eventually::poll::{ConditionPoller, PollConfig, from_fn};
///
/// # tokio_test_block_on(async {
/// let poller = ConditionPoller::new(PollConfig::eventually(
///     Duration::from_millis(200),
///     Duration::from_millis(10),
/// ));
/// let mut n = 0;
/// let result = poller
///     .poll(from_fn(|| { n += 1; Ok::<_, String>(n) }), |n: &i32| *n >= 3)
///     .await?;
/// assert!(result.is_success());
/// # Ok::<_, rust_eventually::EventuallyError>(())
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConditionPoller {
    config: PollConfig,
    cancel: CancellationToken,
    description: Option<String>,
    metrics: Option<Arc<PollMetrics>>,
}

impl ConditionPoller {
    /// Create a poller with the given configuration.
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Describe the assertion; carried into results and errors.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Report into shared metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<PollMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The poller's configuration.
    #[must_use]
    pub const fn config(&self) -> &PollConfig {
        &self.config
    }

    /// The token that cancels this poller's polls.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel running and future polls.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if the poller has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Poll with the configured polarity.
    ///
    /// # Errors
    ///
    /// Only an invalid configuration is an error; every terminal outcome,
    /// including timeouts and violations, is returned in the [`PollResult`].
    pub async fn poll<P, C>(&self, producer: P, condition: C) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        self.run(self.config.clone(), producer, condition).await
    }

    /// Poll until the condition holds or the timeout elapses.
    ///
    /// # Errors
    ///
    /// See [`ConditionPoller::poll`].
    pub async fn eventually<P, C>(&self, producer: P, condition: C) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        let config = self.config.clone().polarity(Polarity::Eventually);
        self.run(config, producer, condition).await
    }

    /// Poll for the whole window, failing as soon as the condition is false.
    ///
    /// # Errors
    ///
    /// See [`ConditionPoller::poll`].
    pub async fn consistently<P, C>(
        &self,
        producer: P,
        condition: C,
    ) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        let config = self.config.clone().polarity(Polarity::Consistently);
        self.run(config, producer, condition).await
    }

    async fn run<P, C>(
        &self,
        config: PollConfig,
        mut producer: P,
        mut condition: C,
    ) -> Result<PollResult<P::Output>>
    where
        P: Producer,
        C: Condition<P::Output>,
    {
        config.validate()?;
        let polarity = config.polarity;
        let budget = config.budget();
        let deadline = Deadline::from_now(budget);

        let timer = self.metrics.as_deref().map(PollMetrics::poll_started);
        debug!(
            %polarity,
            ?budget,
            interval = ?config.interval,
            description = self.description.as_deref(),
            "poll started"
        );

        let mut next_at = deadline.start();
        let mut attempts: u32 = 0;
        let mut true_observations: u32 = 0;
        let mut transport_errors: u32 = 0;
        let mut last = None;
        let mut evidence = None;
        let mut last_error = None;
        let mut end_of_stream = None;
        let mut failed_attempt = None;

        let outcome = loop {
            if !deadline.admits(next_at) {
                break match polarity {
                    Polarity::Consistently if true_observations > 0 && transport_errors == 0 => {
                        PollOutcome::Succeeded
                    }
                    _ => PollOutcome::TimedOut,
                };
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break PollOutcome::Cancelled,
                () = sleep_until(next_at) => {}
            }

            attempts += 1;
            if let Some(metrics) = &self.metrics {
                metrics.attempts.inc();
            }

            // Read before producing so a close racing the read cannot hide final content.
            let ended = producer.exhausted();
            let produced = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break PollOutcome::Cancelled,
                produced = producer.produce() => produced,
            };
            next_at = (next_at + config.interval).max(Instant::now());

            match produced {
                Ok(value) => {
                    let check = condition.check(&value);
                    trace!(attempt = attempts, holds = check.holds, "poll attempt");
                    last = Some(value);
                    match (polarity, check.holds) {
                        (Polarity::Eventually, true) => {
                            evidence = check.evidence;
                            break PollOutcome::Succeeded;
                        }
                        (Polarity::Consistently, false) => {
                            evidence = check.evidence;
                            failed_attempt = Some(attempts);
                            break PollOutcome::PolarityViolated;
                        }
                        (Polarity::Consistently, true) => {
                            true_observations += 1;
                            // A closed stream still has to hold for the whole window.
                            if let Some(failed @ EndOfStream::Failed(_)) = ended {
                                end_of_stream = Some(failed);
                                break PollOutcome::Ended;
                            }
                        }
                        (Polarity::Eventually, false) => {
                            if let Some(end) = ended {
                                end_of_stream = Some(end);
                                break PollOutcome::Ended;
                            }
                        }
                    }
                }
                Err(err) => {
                    transport_errors += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.transport_errors.inc();
                    }
                    debug!(attempt = attempts, error = %err, "producer failed");

                    if polarity == Polarity::Consistently
                        && config.transport_policy == TransportPolicy::Fail
                    {
                        evidence = Some(Evidence::text(err.to_string()));
                        failed_attempt = Some(attempts);
                        last_error = Some(err);
                        break PollOutcome::PolarityViolated;
                    }

                    let stream_gone = *err.kind() == TransportErrorKind::EndOfStream;
                    if stream_gone || ended.is_some() {
                        end_of_stream = Some(
                            ended.unwrap_or_else(|| EndOfStream::Failed(err.message().to_string())),
                        );
                        last_error = Some(err);
                        break PollOutcome::Ended;
                    }
                    last_error = Some(err);
                }
            }
        };

        let elapsed = deadline.elapsed();
        if let (Some(metrics), Some(timer)) = (self.metrics.as_deref(), timer) {
            metrics.poll_finished(outcome, timer);
        }
        debug!(%outcome, attempts, transport_errors, ?elapsed, "poll finished");

        Ok(PollResult {
            outcome,
            polarity,
            budget,
            last,
            evidence,
            last_error,
            end_of_stream,
            failed_attempt,
            elapsed,
            attempts,
            transport_errors,
            description: self.description.clone(),
        })
    }
}

/// Poll until `condition` holds, using `config`'s timeout and interval.
///
/// # Errors
///
/// Returns [`crate::EventuallyError::InvalidConfig`] for an invalid configuration.
pub async fn poll_eventually<P, C>(
    producer: P,
    condition: C,
    config: &PollConfig,
) -> Result<PollResult<P::Output>>
where
    P: Producer,
    C: Condition<P::Output>,
{
    ConditionPoller::new(config.clone())
        .eventually(producer, condition)
        .await
}

/// Require `condition` to hold for `config`'s whole window.
///
/// # Errors
///
/// Returns [`crate::EventuallyError::InvalidConfig`] for an invalid configuration.
pub async fn poll_consistently<P, C>(
    producer: P,
    condition: C,
    config: &PollConfig,
) -> Result<PollResult<P::Output>>
where
    P: Producer,
    C: Condition<P::Output>,
{
    ConditionPoller::new(config.clone())
        .consistently(producer, condition)
        .await
}
