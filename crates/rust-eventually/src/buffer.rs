//! Append-only stream buffer with cursor-based reads.
//!
//! A [`StreamWriter`] is the only handle that can append; any number of
//! [`StreamBuffer`] read handles observe the same content through their own
//! [`Cursor`]s. Appended bytes are never removed or rewritten, so a cursor is
//! just a byte offset and readers never contend with each other.
//!
//! Each append is stored as its own [`Bytes`] segment. Readers only clone
//! segment handles while holding the lock and copy the data after releasing
//! it, so a long read never stalls the writer.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use tokio::sync::watch;

/// A reader's position in a stream buffer.
///
/// Cursors are plain byte offsets; copying one forks an independent reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(usize);

impl Cursor {
    /// A cursor at the very beginning of the stream.
    pub const START: Self = Self(0);

    /// Create a cursor at a byte offset.
    #[must_use]
    pub const fn at(offset: usize) -> Self {
        Self(offset)
    }

    /// The byte offset of this cursor.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }

    /// Move the cursor forward by `n` bytes.
    #[must_use]
    pub const fn advance(self, n: usize) -> Self {
        Self(self.0 + n)
    }
}

/// Terminal marker recorded when the writer side goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOfStream {
    /// The writer closed the stream normally.
    Closed,
    /// The writer stopped because the source failed.
    Failed(String),
}

impl EndOfStream {
    /// Check if the stream ended because of an error.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for EndOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Published after every append so waiters can wake without taking the data lock.
#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    written: usize,
    closed: bool,
}

#[derive(Debug)]
struct Segment {
    start: usize,
    bytes: Bytes,
}

impl Segment {
    fn end(&self) -> usize {
        self.start + self.bytes.len()
    }
}

#[derive(Debug, Default)]
struct State {
    segments: Vec<Segment>,
    len: usize,
    end: Option<EndOfStream>,
}

#[derive(Debug)]
struct Shared {
    state: RwLock<State>,
    progress: watch::Sender<Progress>,
}

impl Shared {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Content read from a buffer between two cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes from `start` up to `next`.
    pub data: Vec<u8>,
    /// Where the read began.
    pub start: Cursor,
    /// The write offset at the time of the read; pass it to the next read.
    pub next: Cursor,
    /// Set once the writer has closed the stream.
    pub end: Option<EndOfStream>,
}

impl Chunk {
    /// The content decoded as UTF-8 (lossy).
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Iterate over the lines in this chunk.
    ///
    /// Blank lines are kept; a trailing partial line is yielded as is.
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> {
        let body = self.data.strip_suffix(b"\n").unwrap_or(&self.data[..]);
        let pieces = (!self.data.is_empty()).then(|| body.split(|&b| b == b'\n'));
        pieces.into_iter().flatten().map(String::from_utf8_lossy)
    }

    /// Check if no content was read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this read hit the end of a closed stream with nothing new.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        self.data.is_empty() && self.end.is_some()
    }
}

/// A read handle onto an append-only stream.
///
/// Clones share the same underlying content.
#[derive(Clone)]
pub struct StreamBuffer {
    shared: Arc<Shared>,
}

impl StreamBuffer {
    /// Create a new buffer, returning its single writer and a read handle.
    #[must_use]
    pub fn channel() -> (StreamWriter, Self) {
        let (progress, _) = watch::channel(Progress::default());
        let shared = Arc::new(Shared {
            state: RwLock::new(State::default()),
            progress,
        });
        (
            StreamWriter {
                shared: Arc::clone(&shared),
            },
            Self { shared },
        )
    }

    /// A cursor at the current write offset.
    ///
    /// Reads through this cursor only observe content appended after this call.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor(self.len())
    }

    /// Number of bytes appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.read().len
    }

    /// Check if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the writer has closed the stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.progress.borrow().closed
    }

    /// The end-of-stream marker, once the stream is closed.
    #[must_use]
    pub fn end_of_stream(&self) -> Option<EndOfStream> {
        self.shared.read().end.clone()
    }

    /// Read everything from `cursor` to the current write offset.
    ///
    /// Nothing is consumed; the returned [`Chunk::next`] is the cursor for the
    /// following read. A cursor past the write offset is clamped to it.
    #[must_use]
    pub fn read_from(&self, cursor: Cursor) -> Chunk {
        let (start, written, parts, end) = {
            let state = self.shared.read();
            let written = state.len;
            let start = cursor.0.min(written);
            let first = state.segments.partition_point(|s| s.end() <= start);
            let parts: Vec<(usize, Bytes)> = state.segments[first..]
                .iter()
                .map(|s| (s.start, s.bytes.clone()))
                .collect();
            (start, written, parts, state.end.clone())
        };

        let mut data = Vec::with_capacity(written - start);
        for (segment_start, bytes) in &parts {
            let skip = start.saturating_sub(*segment_start);
            data.extend_from_slice(&bytes[skip..]);
        }
        Chunk {
            data,
            start: Cursor(start),
            next: Cursor(written),
            end,
        }
    }

    /// Read everything from `cursor` as text (lossy UTF-8).
    #[must_use]
    pub fn text_from(&self, cursor: Cursor) -> String {
        self.read_from(cursor).text().into_owned()
    }

    /// Copy the whole content.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.read_from(Cursor::START).data
    }

    /// Wait until content exists past `cursor`.
    ///
    /// Returns `Err` with the end-of-stream marker when the stream closes
    /// without anything new past `cursor`, instead of waiting forever.
    pub async fn wait_past(&self, cursor: Cursor) -> Result<(), EndOfStream> {
        let mut rx = self.shared.progress.subscribe();
        // The sender lives in `shared`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|p| p.written > cursor.0 || p.closed).await;
        if self.len() > cursor.0 {
            return Ok(());
        }
        Err(self.end_of_stream().unwrap_or(EndOfStream::Closed))
    }
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let progress = *self.shared.progress.borrow();
        f.debug_struct("StreamBuffer")
            .field("written", &progress.written)
            .field("closed", &progress.closed)
            .finish()
    }
}

/// The single writer of a stream buffer.
///
/// Dropping the writer closes the stream with [`EndOfStream::Closed`] unless
/// it was already closed.
pub struct StreamWriter {
    shared: Arc<Shared>,
}

impl StreamWriter {
    /// A read handle onto this writer's buffer.
    #[must_use]
    pub fn buffer(&self) -> StreamBuffer {
        StreamBuffer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Append bytes at the current write offset.
    ///
    /// Returns `false` if the stream is already closed; the bytes are dropped.
    pub fn append(&self, data: &[u8]) -> bool {
        let bytes = Bytes::copy_from_slice(data);
        let written = {
            let mut state = self.shared.write();
            if state.end.is_some() {
                return false;
            }
            if !bytes.is_empty() {
                let start = state.len;
                state.len += bytes.len();
                state.segments.push(Segment { start, bytes });
            }
            state.len
        };
        self.shared.progress.send_modify(|p| p.written = p.written.max(written));
        true
    }

    /// Append a line, adding the trailing newline.
    pub fn append_line(&self, line: &str) -> bool {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.append(&data)
    }

    /// Close the stream normally.
    pub fn close(&self) {
        self.finish(EndOfStream::Closed);
    }

    /// Close the stream, recording the failure that ended it.
    pub fn fail(&self, reason: impl Into<String>) {
        self.finish(EndOfStream::Failed(reason.into()));
    }

    /// Check if the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.progress.borrow().closed
    }

    fn finish(&self, end: EndOfStream) {
        {
            let mut state = self.shared.write();
            if state.end.is_some() {
                return;
            }
            state.end = Some(end);
        }
        self.shared.progress.send_modify(|p| p.closed = true);
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("buffer", &self.buffer())
            .finish()
    }
}

impl std::io::Write for StreamWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.append(buf) {
            Ok(buf.len())
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stream buffer is closed",
            ))
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_from_returns_suffix() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"hello ");
        let cursor = buffer.cursor();
        writer.append(b"world");

        let chunk = buffer.read_from(cursor);
        assert_eq!(chunk.data, b"world");
        assert_eq!(chunk.start, Cursor::at(6));
        assert_eq!(chunk.next, Cursor::at(11));
        assert!(chunk.end.is_none());
    }

    #[test]
    fn reads_do_not_consume() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append_line("a");
        assert_eq!(buffer.text_from(Cursor::START), "a\n");
        assert_eq!(buffer.text_from(Cursor::START), "a\n");
    }

    #[test]
    fn cursor_past_end_is_clamped() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"abc");
        let chunk = buffer.read_from(Cursor::at(100));
        assert!(chunk.is_empty());
        assert_eq!(chunk.start, Cursor::at(3));
    }

    #[test]
    fn close_is_sticky_and_first_marker_wins() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"x");
        writer.fail("connection reset");
        writer.close();
        assert!(!writer.append(b"y"));
        assert_eq!(
            buffer.end_of_stream(),
            Some(EndOfStream::Failed("connection reset".into()))
        );
        assert_eq!(buffer.contents(), b"x");
    }

    #[test]
    fn dropping_writer_closes() {
        let (writer, buffer) = StreamBuffer::channel();
        drop(writer);
        assert!(buffer.is_closed());
        assert!(buffer.read_from(Cursor::START).is_end_of_stream());
    }

    #[test]
    fn chunk_lines() {
        let (writer, buffer) = StreamBuffer::channel();
        for line in ["a", "bb", "x_trace:123"] {
            writer.append_line(line);
        }
        let chunk = buffer.read_from(Cursor::START);
        let lines: Vec<_> = chunk.lines().collect();
        assert_eq!(lines, vec!["a", "bb", "x_trace:123"]);
    }

    #[test]
    fn chunk_lines_keep_blank_lines() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"a\n\n\nb\npartial");
        let chunk = buffer.read_from(Cursor::START);
        let lines: Vec<_> = chunk.lines().collect();
        assert_eq!(lines, vec!["a", "", "", "b", "partial"]);

        let blank = buffer.read_from(Cursor::at(2));
        assert_eq!(blank.lines().next().as_deref(), Some(""));
        assert_eq!(buffer.read_from(buffer.cursor()).lines().count(), 0);
    }

    #[test]
    fn reads_starting_inside_a_segment() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"alpha ");
        writer.append(b"");
        writer.append(b"beta ");
        writer.append(b"gamma");

        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.text_from(Cursor::at(3)), "ha beta gamma");
        assert_eq!(buffer.text_from(Cursor::at(6)), "beta gamma");
        assert_eq!(buffer.text_from(Cursor::at(8)), "ta gamma");
        assert_eq!(buffer.text_from(Cursor::at(15)), "a");
        assert_eq!(buffer.contents(), b"alpha beta gamma");
    }

    #[test]
    fn reads_are_snapshots() {
        let (writer, buffer) = StreamBuffer::channel();
        for i in 0..1000 {
            writer.append_line(&format!("line {i}"));
        }
        let chunk = buffer.read_from(Cursor::START);
        writer.append_line("after");
        assert!(!String::from_utf8_lossy(&chunk.data).contains("after"));
        assert!(buffer.text_from(chunk.next).starts_with("after"));
    }

    #[test]
    fn write_trait() {
        use std::io::Write;

        let (mut writer, buffer) = StreamBuffer::channel();
        write!(writer, "hello {}", 42).unwrap();
        assert_eq!(buffer.text_from(Cursor::START), "hello 42");
    }

    #[tokio::test]
    async fn wait_past_wakes_on_append() {
        let (writer, buffer) = StreamBuffer::channel();
        let cursor = buffer.cursor();
        let waiter = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.wait_past(cursor).await })
        };
        tokio::task::yield_now().await;
        writer.append_line("late");
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn wait_past_reports_end_of_stream() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"old");
        let cursor = buffer.cursor();
        writer.fail("gone");
        assert_eq!(
            buffer.wait_past(cursor).await,
            Err(EndOfStream::Failed("gone".into()))
        );
    }
}
