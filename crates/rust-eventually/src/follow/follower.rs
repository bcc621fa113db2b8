//! Background log following.

use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::decoder::LineDecoder;
use super::source::{FrameStream, LogSource};
use crate::buffer::{StreamBuffer, StreamWriter};
use crate::config::FollowerConfig;
use crate::metrics::FollowerMetrics;
use crate::poll::LogReader;
use crate::util::TimeoutExt;

/// Follows a log source into a [`StreamBuffer`] from a background task.
///
/// The follower is the buffer's only writer. Connection errors never
/// propagate to the caller: they end the buffer with
/// [`EndOfStream::Failed`](crate::EndOfStream::Failed) unless the reconnect
/// policy allows another attempt. A disconnect the follower did not ask for
/// counts as a failure too; only [`LogFollower::stop`] closes the buffer
/// cleanly.
///
/// Dropping a follower cancels and aborts its task, which releases the
/// connection even when [`LogFollower::stop`] is never reached.
#[derive(Debug)]
pub struct LogFollower {
    buffer: StreamBuffer,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    config: FollowerConfig,
    source: String,
}

impl LogFollower {
    /// Start following `source`. Returns immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<S: LogSource>(source: S, config: FollowerConfig) -> Self {
        Self::spawn(source, config, None)
    }

    /// Start following `source`, reporting into `metrics`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start_with_metrics<S: LogSource>(
        source: S,
        config: FollowerConfig,
        metrics: Arc<FollowerMetrics>,
    ) -> Self {
        Self::spawn(source, config, Some(metrics))
    }

    fn spawn<S: LogSource>(
        source: S,
        config: FollowerConfig,
        metrics: Option<Arc<FollowerMetrics>>,
    ) -> Self {
        let (writer, buffer) = StreamBuffer::channel();
        let cancel = CancellationToken::new();
        let name = source.describe();
        info!(source = %name, "starting log follower");

        let task = tokio::spawn(follow_source(
            source,
            writer,
            config.clone(),
            cancel.clone(),
            metrics,
        ));

        Self {
            buffer,
            cancel,
            task: Some(task),
            config,
            source: name,
        }
    }

    /// A read handle onto the followed content.
    #[must_use]
    pub fn buffer(&self) -> StreamBuffer {
        self.buffer.clone()
    }

    /// A reader that only sees content arriving after this call.
    #[must_use]
    pub fn reader(&self) -> LogReader {
        LogReader::new(&self.buffer)
    }

    /// The source description.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// A token that stops the background task when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check whether the background task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop following and wait for the background task to exit.
    ///
    /// Idempotent. A task that does not exit within the configured stop
    /// timeout is aborted. The buffer stays readable afterwards.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };

        match (&mut task).with_timeout(self.config.stop_timeout).await {
            Ok(Ok(())) => debug!(source = %self.source, "log follower stopped"),
            Ok(Err(err)) => warn!(source = %self.source, error = %err, "log follower task failed"),
            Err(_) => {
                warn!(
                    source = %self.source,
                    timeout = ?self.config.stop_timeout,
                    "log follower did not stop in time; aborting"
                );
                task.abort();
            }
        }
    }
}

impl Drop for LogFollower {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Follow `source` for the duration of `body`, stopping on every exit path.
///
/// If `body` panics or the returned future is dropped, the follower's `Drop`
/// still releases the connection.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub async fn follow<S, F, Fut, T>(source: S, config: FollowerConfig, body: F) -> T
where
    S: LogSource,
    F: FnOnce(StreamBuffer) -> Fut,
    Fut: Future<Output = T>,
{
    let mut follower = LogFollower::start(source, config);
    let out = body(follower.buffer()).await;
    follower.stop().await;
    out
}

/// Why a connection ended.
enum Disconnect {
    Cancelled,
    Eof { lines: u64 },
    Failed { error: io::Error, lines: u64 },
}

/// Decrements the active gauge however the task exits, abort included.
struct ActiveGuard(Option<Arc<FollowerMetrics>>);

impl ActiveGuard {
    fn new(metrics: Option<Arc<FollowerMetrics>>) -> Self {
        if let Some(m) = &metrics {
            m.active.inc();
        }
        Self(metrics)
    }

    fn metrics(&self) -> Option<&FollowerMetrics> {
        self.0.as_deref()
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if let Some(m) = &self.0 {
            m.active.dec();
        }
    }
}

async fn follow_source<S: LogSource>(
    mut source: S,
    writer: StreamWriter,
    config: FollowerConfig,
    cancel: CancellationToken,
    metrics: Option<Arc<FollowerMetrics>>,
) {
    let guard = ActiveGuard::new(metrics);
    let name = source.describe();
    let mut failures: u32 = 0;

    loop {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            opened = source.open() => opened,
        };

        let disconnect = match opened {
            Ok(frames) => {
                if let Some(m) = guard.metrics() {
                    m.connections.inc();
                }
                info!(source = %name, "log source connected");
                pump(frames, &writer, &config, &cancel, guard.metrics()).await
            }
            Err(error) => Disconnect::Failed { error, lines: 0 },
        };

        let (error, lines) = match disconnect {
            Disconnect::Cancelled => break,
            Disconnect::Eof { lines } => {
                info!(source = %name, lines, "log source closed the connection");
                (None, lines)
            }
            Disconnect::Failed { error, lines } => {
                if let Some(m) = guard.metrics() {
                    m.errors.inc();
                }
                warn!(source = %name, %error, "log source failed");
                (Some(error), lines)
            }
        };

        if lines > 0 {
            failures = 0;
        }
        let Some(delay) = config.reconnect.delay_for_attempt(failures) else {
            match error {
                Some(error) => writer.fail(format!("{name}: {error}")),
                None => writer.fail(format!("{name}: connection closed by remote")),
            }
            return;
        };

        failures += 1;
        if let Some(m) = guard.metrics() {
            m.reconnects.inc();
        }
        info!(source = %name, attempt = failures, ?delay, "reconnecting to log source");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!(source = %name, "log follower cancelled");
    writer.close();
}

/// Copy lines from one connection into the buffer until it ends or is cancelled.
///
/// The frame stream is dropped on return, releasing the connection.
async fn pump(
    frames: FrameStream,
    writer: &StreamWriter,
    config: &FollowerConfig,
    cancel: &CancellationToken,
    metrics: Option<&FollowerMetrics>,
) -> Disconnect {
    let decoder = LineDecoder::new(config.max_line_length, config.strip_carriage_returns);
    let mut lines = FramedRead::new(StreamReader::new(frames), decoder);
    let mut count: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Disconnect::Cancelled,
            next = lines.next() => next,
        };
        match next {
            Some(Ok(line)) => {
                count += 1;
                append_line(writer, &line, metrics);
            }
            Some(Err(error)) => return Disconnect::Failed { error, lines: count },
            None => return Disconnect::Eof { lines: count },
        }
    }
}

fn append_line(writer: &StreamWriter, line: &Bytes, metrics: Option<&FollowerMetrics>) {
    let mut data = Vec::with_capacity(line.len() + 1);
    data.extend_from_slice(line);
    data.push(b'\n');
    writer.append(&data);
    if let Some(m) = metrics {
        m.lines.inc();
        m.bytes.add(data.len() as u64);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::buffer::EndOfStream;
    use crate::follow::ReconnectPolicy;
    use crate::test_utils::{ScriptedSession, ScriptedSource};

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn lines_are_appended_in_order() {
        let source =
            ScriptedSource::new().session(ScriptedSession::new().lines(["a", "bb"]).hold());
        let mut follower = LogFollower::start(source, FollowerConfig::default());
        let buffer = follower.buffer();
        settle().await;
        assert_eq!(buffer.contents(), b"a\nbb\n");
        follower.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_releases_once() {
        let source = ScriptedSource::new().session(ScriptedSession::new().line("x").hold());
        let stats = source.stats();
        let mut follower = LogFollower::start(source, FollowerConfig::default());
        settle().await;
        assert_eq!(stats.open_connections(), 1);

        follower.stop().await;
        follower.stop().await;
        follower.stop().await;
        assert!(!follower.is_running());
        assert_eq!(stats.released(), 1);
        assert_eq!(follower.buffer().end_of_stream(), Some(EndOfStream::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_connecting() {
        let source = ScriptedSource::new().session(
            ScriptedSession::new()
                .sleep(Duration::from_secs(1))
                .line("late"),
        );
        let stats = source.stats();
        let mut follower = LogFollower::start(source, FollowerConfig::default());
        follower.stop().await;
        assert!(follower.buffer().is_empty());
        assert_eq!(stats.open_connections(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_connection() {
        let source = ScriptedSource::new().session(ScriptedSession::new().hold());
        let stats = source.stats();
        let follower = LogFollower::start(source, FollowerConfig::default());
        settle().await;
        assert_eq!(stats.open_connections(), 1);

        drop(follower);
        settle().await;
        assert_eq!(stats.open_connections(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connection_fails_the_buffer() {
        let source = ScriptedSource::new().refuse("connection refused");
        let follower = LogFollower::start(source, FollowerConfig::default());
        settle().await;
        match follower.buffer().end_of_stream() {
            Some(EndOfStream::Failed(reason)) => assert!(reason.starts_with("scripted: ")),
            other => panic!("expected failure marker, got {other:?}"),
        }
        assert!(!follower.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_disconnect_fails_the_buffer() {
        let source = ScriptedSource::new().session(ScriptedSession::new().line("bye"));
        let follower = LogFollower::start(source, FollowerConfig::default());
        settle().await;
        let buffer = follower.buffer();
        assert_eq!(buffer.contents(), b"bye\n");
        assert_eq!(
            buffer.end_of_stream(),
            Some(EndOfStream::Failed("scripted: connection closed by remote".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn never_says_ends_when_the_source_goes_away() {
        let source = ScriptedSource::new().session(
            ScriptedSession::new()
                .sleep(Duration::from_millis(50))
                .line("hello"),
        );
        let follower = LogFollower::start(source, FollowerConfig::default());
        let reader = follower.reader();
        settle().await;

        let poller = crate::poll::ConditionPoller::new(crate::poll::PollConfig::consistently(
            Duration::from_secs(5),
            Duration::from_millis(100),
        ));
        let result = reader.never_says("11111", &poller).await.unwrap();
        assert_eq!(result.outcome, crate::poll::PollOutcome::Ended);
        assert!(result.end_of_stream.is_some_and(|end| end.is_failure()));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_and_keeps_appending() {
        let source = ScriptedSource::new()
            .session(ScriptedSession::new().line("first").fail("reset"))
            .refuse("still down")
            .session(ScriptedSession::new().line("second").hold());
        let stats = source.stats();
        let metrics = Arc::new(FollowerMetrics::new());
        let config = FollowerConfig::new()
            .reconnect(ReconnectPolicy::fixed(Duration::from_millis(100), 3));
        let mut follower = LogFollower::start_with_metrics(source, config, Arc::clone(&metrics));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(follower.buffer().contents(), b"first\nsecond\n");
        assert!(follower.is_running());
        assert_eq!(stats.opens(), 3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections, 2);
        assert_eq!(snapshot.reconnects, 2);
        assert_eq!(snapshot.lines, 2);
        assert_eq!(snapshot.active, 1);

        follower.stop().await;
        assert_eq!(metrics.snapshot().active, 0);
        assert_eq!(stats.open_connections(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_attempts_are_bounded() {
        let source = ScriptedSource::new().refuse("a").refuse("b").refuse("c");
        let config = FollowerConfig::new()
            .reconnect(ReconnectPolicy::fixed(Duration::from_millis(10), 2));
        let follower = LogFollower::start(source, config);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(follower.buffer().end_of_stream().is_some_and(|e| e.is_failure()));
    }

    #[tokio::test(start_paused = true)]
    async fn follow_stops_on_exit() {
        let source = ScriptedSource::new().session(ScriptedSession::new().line("hi").hold());
        let stats = source.stats();
        let seen = follow(source, FollowerConfig::default(), |buffer| async move {
            buffer.wait_past(crate::Cursor::START).await.ok();
            buffer.contents()
        })
        .await;
        assert_eq!(seen, b"hi\n");
        assert_eq!(stats.open_connections(), 0);
    }
}
