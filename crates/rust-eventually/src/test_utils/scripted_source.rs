//! A log source that replays scripted connections.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, Stream};

use crate::follow::{FrameStream, LogSource};

#[derive(Debug, Clone)]
enum Step {
    Frame(Bytes),
    Sleep(Duration),
    Fail(String),
    Hold,
}

/// The script for one connection.
///
/// Without [`ScriptedSession::fail`] or [`ScriptedSession::hold`] the
/// stream ends after the last step.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSession {
    steps: Vec<Step>,
}

impl ScriptedSession {
    /// An empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one line with a trailing newline.
    #[must_use]
    pub fn line(self, line: &str) -> Self {
        self.bytes(format!("{line}\n"))
    }

    /// Deliver several lines.
    #[must_use]
    pub fn lines<'a>(self, lines: impl IntoIterator<Item = &'a str>) -> Self {
        lines.into_iter().fold(self, Self::line)
    }

    /// Deliver a raw frame.
    #[must_use]
    pub fn bytes(mut self, data: impl Into<Bytes>) -> Self {
        self.steps.push(Step::Frame(data.into()));
        self
    }

    /// Wait before the next step.
    #[must_use]
    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Sleep(duration));
        self
    }

    /// Break the connection with an error.
    #[must_use]
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.steps.push(Step::Fail(message.into()));
        self
    }

    /// Keep the connection open until it is released.
    #[must_use]
    pub fn hold(mut self) -> Self {
        self.steps.push(Step::Hold);
        self
    }
}

/// Connection counters shared between a [`ScriptedSource`] and the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptStats {
    opens: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl ScriptStats {
    /// Calls to `open`, refused ones included.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Connections handed out.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Connections whose stream has been dropped.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Connections handed out and not yet released.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.connections().saturating_sub(self.released())
    }
}

/// A [`LogSource`] that plays one scripted session per `open`.
///
/// Once the script runs out, further opens are refused.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    sessions: VecDeque<Result<ScriptedSession, String>>,
    stats: ScriptStats,
}

impl ScriptedSource {
    /// A source with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a connection.
    #[must_use]
    pub fn session(mut self, session: ScriptedSession) -> Self {
        self.sessions.push_back(Ok(session));
        self
    }

    /// Queue a refused connection attempt.
    #[must_use]
    pub fn refuse(mut self, message: impl Into<String>) -> Self {
        self.sessions.push_back(Err(message.into()));
        self
    }

    /// Counters that stay readable after the source moves into a follower.
    #[must_use]
    pub fn stats(&self) -> ScriptStats {
        self.stats.clone()
    }
}

impl LogSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn open(&mut self) -> BoxFuture<'_, io::Result<FrameStream>> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        let next = self.sessions.pop_front();
        let stats = self.stats.clone();
        Box::pin(async move {
            let session = match next {
                Some(Ok(session)) => session,
                Some(Err(message)) => {
                    return Err(io::Error::new(io::ErrorKind::ConnectionRefused, message));
                }
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionRefused,
                        "script exhausted",
                    ));
                }
            };
            stats.connections.fetch_add(1, Ordering::SeqCst);
            let frames: FrameStream = Box::pin(Released {
                inner: Box::pin(play(session.steps)),
                released: stats.released,
            });
            Ok(frames)
        })
    }
}

fn play(steps: Vec<Step>) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    stream::unfold(VecDeque::from(steps), |mut steps| async move {
        loop {
            match steps.pop_front()? {
                Step::Frame(data) => return Some((Ok(data), steps)),
                Step::Sleep(duration) => tokio::time::sleep(duration).await,
                Step::Fail(message) => {
                    steps.clear();
                    let error = io::Error::new(io::ErrorKind::ConnectionReset, message);
                    return Some((Err(error), steps));
                }
                Step::Hold => std::future::pending::<()>().await,
            }
        }
    })
}

/// Counts the release of a connection when its stream is dropped.
struct Released {
    inner: FrameStream,
    released: Arc<AtomicUsize>,
}

impl Stream for Released {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for Released {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn plays_sessions_in_order() {
        let mut source = ScriptedSource::new()
            .session(ScriptedSession::new().line("a").line("b"))
            .refuse("down");
        let stats = source.stats();

        let frames: Vec<_> = source.open().await.unwrap().collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(stats.released(), 1);

        let err = source.open().await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        assert_eq!(stats.opens(), 2);
        assert_eq!(stats.connections(), 1);
    }

    #[tokio::test]
    async fn failure_ends_the_session() {
        let mut source =
            ScriptedSource::new().session(ScriptedSession::new().line("x").fail("reset").line("y"));
        let frames: Vec<_> = source.open().await.unwrap().collect().await;
        assert_eq!(frames.len(), 2);
        assert!(frames[1].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn held_connection_stays_open_until_dropped() {
        let mut source = ScriptedSource::new().session(ScriptedSession::new().line("x").hold());
        let stats = source.stats();
        let mut frames = source.open().await.unwrap();
        assert!(frames.next().await.is_some());
        let pending =
            tokio::time::timeout(Duration::from_secs(60), frames.next()).await;
        assert!(pending.is_err());
        assert_eq!(stats.open_connections(), 1);
        drop(frames);
        assert_eq!(stats.open_connections(), 0);
    }
}
