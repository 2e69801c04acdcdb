//! Tokio codec for newline-delimited protocol lines
//!
//! Both transports share this codec: the stream transport wraps a
//! `TcpStream` in `Framed`, the datagram transport wraps a `UdpSocket` in
//! `UdpFramed`. A single datagram may carry several lines, and its last line
//! does not need a trailing newline.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;

/// Maximum accepted line length in bytes (excluding the terminator)
pub const MAX_LINE_LENGTH: usize = 1024;

/// Codec splitting a byte stream into UTF-8 text lines.
///
/// An inbound line longer than the limit is discarded up to its newline and
/// decoding carries on with the next line. Only encoding reports
/// [`ProtocolError::LineTooLong`].
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Longest line accepted
    max_length: usize,
    /// Offset already scanned for a newline, so partial reads are not rescanned
    next_index: usize,
    /// Inside an over-long line; bytes are dropped until the next newline
    is_discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default maximum line length
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            is_discarding: false,
        }
    }

    /// Maximum accepted line length
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Whether the codec is skipping the rest of an over-long line
    pub fn is_discarding(&self) -> bool {
        self.is_discarding
    }

    /// Text of a complete line, or `None` when it is over the limit
    fn line_from(&self, bytes: &[u8]) -> Option<String> {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        if bytes.len() > self.max_length {
            tracing::warn!(
                "Discarding line of {} bytes (limit {})",
                bytes.len(),
                self.max_length
            );
            return None;
        }
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let start = self.next_index.min(src.len());
            let newline = src[start..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| start + offset);

            match (self.is_discarding, newline) {
                (true, Some(end)) => {
                    src.advance(end + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(end)) => {
                    self.next_index = 0;
                    let raw = src.split_to(end + 1);
                    if let Some(line) = self.line_from(&raw[..end]) {
                        return Ok(Some(line));
                    }
                }
                (false, None) => {
                    // One spare byte for a '\r' still waiting for its '\n'
                    if src.len() > self.max_length + 1 {
                        tracing::warn!(
                            "Discarding line longer than {} bytes",
                            self.max_length
                        );
                        src.clear();
                        self.next_index = 0;
                        self.is_discarding = true;
                        return Ok(None);
                    }
                    // Need more data
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // End of input (or of a datagram) also ends any discarded line
        self.is_discarding = false;
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }

        // Unterminated final line
        let rest = src.split();
        Ok(self.line_from(&rest))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = line.as_ref();
        if line.len() > self.max_length {
            return Err(ProtocolError::LineTooLong {
                length: line.len(),
                max: self.max_length,
            });
        }

        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
