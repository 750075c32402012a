//! Incremental UTF-8 decoding for the agent byte stream.
//!
//! Network chunk boundaries can split a multi-byte sequence; the carry
//! buffer holds an incomplete tail until the next chunk completes it.

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct InvalidUtf8;

#[derive(Debug, Default)]
pub(crate) struct Utf8Carry {
    buf: Vec<u8>,
}

impl Utf8Carry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Decode as much of the accumulated bytes as possible. An incomplete
    /// trailing sequence is retained for the next call; an invalid sequence
    /// anywhere is a hard error.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<String, InvalidUtf8> {
        self.buf.extend_from_slice(bytes);
        match std::str::from_utf8(&self.buf) {
            Ok(_) => {
                let complete = std::mem::take(&mut self.buf);
                String::from_utf8(complete).map_err(|_| InvalidUtf8)
            }
            Err(e) => {
                if e.error_len().is_some() {
                    return Err(InvalidUtf8);
                }
                let tail = self.buf.split_off(e.valid_up_to());
                let valid = std::mem::replace(&mut self.buf, tail);
                String::from_utf8(valid).map_err(|_| InvalidUtf8)
            }
        }
    }

    /// Bytes still waiting for completion. Non-empty at end of stream means
    /// the agent truncated a multi-byte character.
    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
