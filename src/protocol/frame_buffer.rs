//! Frame buffer for accumulating partial reads.
//!
//! TCP has no message boundaries, so callers append newly-received bytes
//! and extract whatever complete frames have accumulated. Uses
//! `bytes::BytesMut` for zero-copy buffer management and a state machine
//! for fragmented frames:
//! - `WaitingForPrefix`: need at least 4 bytes
//! - `WaitingForPayload`: prefix parsed, need N more payload bytes
//!
//! # Example
//!
//! ```
//! use rasterwire::protocol::{encode_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let frames = buffer.push(&encode_frame(b"{}")).unwrap();
//! assert_eq!(frames.len(), 1);
//! assert_eq!(&frames[0][..], b"{}");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{decode_length, validate_length, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE};
use crate::error::Result;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete length prefix.
    WaitingForPrefix,
    /// Prefix parsed, waiting for payload bytes.
    WaitingForPayload { remaining: u32 },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// All data is stored in a single `BytesMut` buffer to minimize
/// allocations; payloads are handed out as zero-copy `Bytes`.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with a custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::WaitingForPrefix,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns a vector of complete payloads (may be empty if still waiting
    /// for data). Fragmented data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns an error if a length prefix exceeds the maximum payload
    /// size. The connection must be closed in that case; the buffer is left
    /// in an unusable state on purpose.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(payload) = self.try_extract_one()? {
            frames.push(payload);
        }
        Ok(frames)
    }

    /// Try to extract a single frame payload from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match &self.state {
            State::WaitingForPrefix => {
                let Some(length) = decode_length(&self.buffer) else {
                    return Ok(None);
                };
                validate_length(length, self.max_payload_size)?;

                let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);

                if length == 0 {
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::WaitingForPayload { remaining: length };
                self.try_extract_one()
            }

            State::WaitingForPayload { remaining } => {
                let remaining = *remaining as usize;
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForPrefix;
                Ok(Some(payload))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForPrefix;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForPrefix => "WaitingForPrefix",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
