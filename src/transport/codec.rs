//! Line framing for byte-stream transports.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;

use super::MAX_IRC_LINE_LEN;

/// Splits a byte stream into lines and terminates outbound lines with CRLF.
///
/// Lines end at `\n`; a trailing `\r` is stripped and empty lines are
/// skipped. Invalid UTF-8 is replaced rather than rejected.
#[derive(Clone, Debug)]
pub struct LineCodec {
    /// Bytes already searched for a newline.
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_IRC_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    return Err(ProtocolError::MessageTooLong(src.len()));
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = self.next_index + offset;
            let frame = src.split_to(end + 1);
            self.next_index = 0;

            if end > self.max_len {
                return Err(ProtocolError::MessageTooLong(end));
            }
            let line = decode_line(&frame[..end]);
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let frame = src.split_to(src.len());
        self.next_index = 0;
        let line = decode_line(&frame);
        Ok((!line.is_empty()).then_some(line))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = item.as_ref();
        if let Some(c) = line.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
            return Err(ProtocolError::IllegalControlChar(c));
        }
        if line.len() > self.max_len {
            return Err(ProtocolError::MessageTooLong(line.len()));
        }
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
