//! Line framing for follower connections.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Splits raw frames into lines.
///
/// Lines longer than `max_length` are split into `max_length` pieces instead
/// of buffering without bound. A trailing partial line is emitted when the
/// connection ends.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    max_length: usize,
    strip_carriage_returns: bool,
    /// Bytes already scanned for a newline.
    next_index: usize,
}

impl LineDecoder {
    /// Create a decoder.
    #[must_use]
    pub fn new(max_length: usize, strip_carriage_returns: bool) -> Self {
        Self {
            max_length: max_length.max(1),
            strip_carriage_returns,
            next_index: 0,
        }
    }

    /// The longest line emitted in one piece.
    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    fn finish_line(&mut self, mut line: BytesMut) -> Bytes {
        self.next_index = 0;
        if self.strip_carriage_returns && line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        line.freeze()
    }
}

impl Decoder for LineDecoder {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        // A newline at index max_length still terminates a full-length line.
        let limit = src.len().min(self.max_length.saturating_add(1));
        let from = self.next_index.min(limit);

        if let Some(pos) = src[from..limit].iter().position(|&b| b == b'\n') {
            let newline = from + pos;
            let mut line = src.split_to(newline + 1);
            line.truncate(newline);
            return Ok(Some(self.finish_line(line)));
        }

        if src.len() > self.max_length {
            let line = src.split_to(self.max_length);
            self.next_index = 0;
            return Ok(Some(line.freeze()));
        }

        self.next_index = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, io::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split_to(src.len());
        Ok(Some(self.finish_line(rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut LineDecoder, input: &[u8]) -> Vec<Bytes> {
        let mut src = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(line) = decoder.decode(&mut src).unwrap() {
            out.push(line);
        }
        while let Some(line) = decoder.decode_eof(&mut src).unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn splits_lines_and_strips_cr() {
        let mut decoder = LineDecoder::new(1024, true);
        let lines = decode_all(&mut decoder, b"a\r\nbb\nx_trace:123");
        assert_eq!(lines, vec!["a", "bb", "x_trace:123"]);
    }

    #[test]
    fn keeps_cr_when_asked() {
        let mut decoder = LineDecoder::new(1024, false);
        let lines = decode_all(&mut decoder, b"a\r\n");
        assert_eq!(lines, vec!["a\r"]);
    }

    #[test]
    fn splits_long_lines() {
        let mut decoder = LineDecoder::new(4, true);
        let lines = decode_all(&mut decoder, b"abcdefghij\nxy\n");
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn full_length_line_keeps_its_newline_boundary() {
        let mut decoder = LineDecoder::new(4, true);
        let lines = decode_all(&mut decoder, b"abcd\nef\n");
        assert_eq!(lines, vec!["abcd", "ef"]);
    }

    #[test]
    fn line_split_across_frames() {
        let mut decoder = LineDecoder::new(1024, true);
        let mut src = BytesMut::from(&b"hel"[..]);
        assert!(decoder.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b"lo\nwor");
        assert_eq!(decoder.decode(&mut src).unwrap().unwrap(), "hello");
        assert!(decoder.decode(&mut src).unwrap().is_none());
        assert_eq!(decoder.decode_eof(&mut src).unwrap().unwrap(), "wor");
        assert!(decoder.decode_eof(&mut src).unwrap().is_none());
    }
}
