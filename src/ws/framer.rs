//! Outbound frame batching and inbound line normalization
//!
//! Outbound payloads are newline-terminated and accumulated in a rolling
//! buffer; on each aggregation tick the buffered block is taken as one
//! transmission, so payloads queued within the same window share a single
//! write. Inbound bytes are normalized so one message is always exactly one
//! logical line.

use bytes::{BufMut, Bytes, BytesMut};

/// Rolling buffer that batches newline-terminated payloads into frames
#[derive(Debug, Default)]
pub struct Framer {
    buf: BytesMut,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Append one payload, newline-terminated, to the rolling buffer
    pub fn push(&mut self, payload: &[u8]) {
        self.buf.reserve(payload.len() + 1);
        self.buf.put_slice(payload);
        self.buf.put_u8(b'\n');
    }

    /// Take the buffered newline-terminated block, if any.
    ///
    /// Everything up to and including the last newline is extracted as a
    /// single frame; any trailing partial line stays buffered.
    pub fn take_block(&mut self) -> Option<Bytes> {
        let end = self.buf.iter().rposition(|&b| b == b'\n')? + 1;
        Some(self.buf.split_to(end).freeze())
    }

    /// Whether the buffer currently holds no complete line
    pub fn is_empty(&self) -> bool {
        !self.buf.contains(&b'\n')
    }
}

/// Normalize an inbound message to exactly one logical line: embedded
/// newlines collapse to spaces and surrounding whitespace is trimmed.
pub fn normalize_line(raw: &str) -> String {
    raw.replace('\n', " ").trim().to_string()
}
