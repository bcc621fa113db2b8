//! Producers supply one observation per poll attempt.

use std::future::{Future, ready};

use crate::buffer::{Cursor, EndOfStream, StreamBuffer};
use crate::error::TransportError;

/// Supplies the current observation for a poll attempt.
///
/// Any `FnMut() -> impl Future<Output = Result<T, E>>` with
/// `E: Into<TransportError>` is a producer. Wrap synchronous closures with
/// [`from_fn`].
pub trait Producer {
    /// The observed value.
    type Output;

    /// Obtain the current observation.
    fn produce(&mut self) -> impl Future<Output = Result<Self::Output, TransportError>>;

    /// Report that no future observation can differ from the next one.
    ///
    /// Checked before each attempt. Producers over a closed stream return the
    /// end-of-stream marker so an eventually poll can stop instead of spinning
    /// until its deadline. Consistently polls still hold a cleanly closed
    /// stream for the whole window and end on a failed one.
    fn exhausted(&self) -> Option<EndOfStream> {
        None
    }
}

impl<F, Fut, T, E> Producer for F
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<TransportError>,
{
    type Output = T;

    fn produce(&mut self) -> impl Future<Output = Result<T, TransportError>> {
        let fut = self();
        async move { fut.await.map_err(Into::into) }
    }
}

/// A producer backed by a synchronous closure.
#[derive(Debug, Clone)]
pub struct FromFn<F>(F);

/// Wrap a synchronous closure as a producer.
pub const fn from_fn<F, T, E>(f: F) -> FromFn<F>
where
    F: FnMut() -> Result<T, E>,
    E: Into<TransportError>,
{
    FromFn(f)
}

impl<F, T, E> Producer for FromFn<F>
where
    F: FnMut() -> Result<T, E>,
    E: Into<TransportError>,
{
    type Output = T;

    fn produce(&mut self) -> impl Future<Output = Result<T, TransportError>> {
        ready((self.0)().map_err(Into::into))
    }
}

/// Produces the text of a buffer from a fixed cursor to the current write offset.
///
/// Every attempt re-reads the whole window, so a pattern split across two
/// appends is still found.
#[derive(Debug, Clone)]
pub struct BufferWindow {
    buffer: StreamBuffer,
    cursor: Cursor,
}

impl BufferWindow {
    /// A window starting at `cursor`.
    #[must_use]
    pub const fn new(buffer: StreamBuffer, cursor: Cursor) -> Self {
        Self { buffer, cursor }
    }

    /// A window starting at the buffer's current write offset.
    #[must_use]
    pub fn from_now(buffer: &StreamBuffer) -> Self {
        Self::new(buffer.clone(), buffer.cursor())
    }

    /// Where the window starts.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }
}

impl Producer for BufferWindow {
    type Output = String;

    fn produce(&mut self) -> impl Future<Output = Result<String, TransportError>> {
        ready(Ok(self.buffer.text_from(self.cursor)))
    }

    fn exhausted(&self) -> Option<EndOfStream> {
        self.buffer.end_of_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn async_closure_producer() {
        let mut calls = 0;
        let mut producer = move || {
            calls += 1;
            let n = calls;
            async move { Ok::<_, TransportError>(n) }
        };
        assert_eq!(producer.produce().await, Ok(1));
        assert_eq!(producer.produce().await, Ok(2));
    }

    #[tokio::test]
    async fn sync_producer_maps_errors() {
        let mut producer = from_fn(|| Err::<(), _>("connection refused"));
        let err = producer.produce().await.unwrap_err();
        assert_eq!(err.message(), "connection refused");
    }

    #[tokio::test]
    async fn buffer_window_reports_end() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append_line("before");
        let mut window = BufferWindow::from_now(&buffer);
        writer.append_line("after");
        assert_eq!(window.produce().await.unwrap(), "after\n");
        assert!(window.exhausted().is_none());
        writer.close();
        assert_eq!(window.exhausted(), Some(EndOfStream::Closed));
    }
}
