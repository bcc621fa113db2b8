//! Cursor-scoped assertions over a live log buffer.
//!
//! A [`LogReader`] remembers how far into a [`StreamBuffer`] earlier
//! assertions have matched. Each successful `eventually_says` moves the
//! reader past the matched text, so a chain of assertions must be satisfied
//! in stream order, and a following `never_says` only looks at content after
//! the last match.

use super::condition::{Check, Evidence};
use super::poller::ConditionPoller;
use super::producer::BufferWindow;
use super::result::PollResult;
use crate::buffer::{Cursor, StreamBuffer};
use crate::error::Result;
use crate::matching::{Extractor, Pattern, PatternMatch};

/// A reader over a stream buffer with its own cursor.
#[derive(Debug, Clone)]
pub struct LogReader {
    buffer: StreamBuffer,
    cursor: Cursor,
}

impl LogReader {
    /// A reader that only sees content appended after this call.
    #[must_use]
    pub fn new(buffer: &StreamBuffer) -> Self {
        Self::at(buffer, buffer.cursor())
    }

    /// A reader that sees the whole buffer, history included.
    #[must_use]
    pub fn from_start(buffer: &StreamBuffer) -> Self {
        Self::at(buffer, Cursor::START)
    }

    /// A reader starting at `cursor`.
    #[must_use]
    pub fn at(buffer: &StreamBuffer, cursor: Cursor) -> Self {
        Self {
            buffer: buffer.clone(),
            cursor,
        }
    }

    /// The reader's cursor.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The underlying buffer.
    #[must_use]
    pub const fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Move the cursor to the current write offset, discarding unread content.
    pub fn skip_to_end(&mut self) {
        self.cursor = self.buffer.cursor();
    }

    /// Text from the cursor to the current write offset.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer.text_from(self.cursor)
    }

    /// Check once, without waiting, whether `pattern` appears past the cursor.
    ///
    /// Positions in the returned match are stream offsets.
    #[must_use]
    pub fn says(&self, pattern: &Pattern) -> Option<PatternMatch> {
        pattern
            .find(&self.contents())
            .map(|m| m.offset_by(self.cursor.offset()))
    }

    /// Extract a value from the content past the cursor.
    #[must_use]
    pub fn extract(&self, extractor: &Extractor) -> Option<String> {
        extractor.extract(&self.contents())
    }

    /// Wait for `pattern` to appear past the cursor.
    ///
    /// Every attempt rescans the whole cursor-to-now window. On success the
    /// cursor moves to the end of the match; otherwise it stays put.
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid poll configuration.
    pub async fn eventually_says(
        &mut self,
        pattern: impl Into<Pattern>,
        poller: &ConditionPoller,
    ) -> Result<PollResult<String>> {
        let pattern = pattern.into();
        let base = self.cursor.offset();
        let condition = move |text: &String| match pattern.find(text) {
            Some(m) => Check::pass().with_evidence(Evidence::at(m.text, base + m.start)),
            None => Check::fail(),
        };
        let result = poller
            .eventually(BufferWindow::new(self.buffer.clone(), self.cursor), condition)
            .await?;

        if result.is_success() {
            if let Some(end) = result.evidence.as_ref().and_then(Evidence::end) {
                self.cursor = Cursor::at(end);
            }
        }
        Ok(result)
    }

    /// Require `pattern` to stay absent past the cursor for the poller's window.
    ///
    /// The window is fixed at the cursor when the check starts; content that
    /// was already there before the cursor can never trip it.
    ///
    /// # Errors
    ///
    /// Returns an error only for an invalid poll configuration.
    pub async fn never_says(
        &self,
        pattern: impl Into<Pattern>,
        poller: &ConditionPoller,
    ) -> Result<PollResult<String>> {
        let pattern = pattern.into();
        let base = self.cursor.offset();
        let condition = move |text: &String| match pattern.find(text) {
            Some(m) => Check::fail().with_evidence(Evidence::at(m.text, base + m.start)),
            None => Check::pass(),
        };
        poller
            .consistently(BufferWindow::new(self.buffer.clone(), self.cursor), condition)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::poll::{PollConfig, PollOutcome};

    fn poller() -> ConditionPoller {
        ConditionPoller::new(
            PollConfig::eventually(Duration::from_millis(200), Duration::from_millis(10))
                .window(Duration::from_millis(50)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn says_advances_past_match() {
        let (writer, buffer) = StreamBuffer::channel();
        let mut reader = LogReader::new(&buffer);
        writer.append_line("one");
        writer.append_line("two");

        let result = reader.eventually_says("one", &poller()).await.unwrap();
        assert!(result.is_success());
        assert_eq!(reader.cursor(), Cursor::at(3));

        // "one" is now behind the cursor.
        let again = reader.eventually_says("one", &poller()).await.unwrap();
        assert_eq!(again.outcome, PollOutcome::TimedOut);
        assert_eq!(reader.cursor(), Cursor::at(3));
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_invisible_to_new_reader() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append_line("11111");
        let reader = LogReader::new(&buffer);
        let result = reader.never_says("11111", &poller()).await.unwrap();
        assert_eq!(result.outcome, PollOutcome::Succeeded);
    }

    #[test]
    fn says_reports_stream_offsets() {
        let (writer, buffer) = StreamBuffer::channel();
        writer.append(b"xxxx");
        let reader = LogReader::new(&buffer);
        writer.append(b"ab");
        let m = reader.says(&Pattern::literal("b")).unwrap();
        assert_eq!((m.start, m.end), (5, 6));
    }
}
