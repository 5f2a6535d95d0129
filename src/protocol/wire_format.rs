//! Wire format encoding and decoding.
//!
//! A frame is a fixed-width length prefix followed by a JSON payload:
//!
//! ```text
//! ┌──────────┬──────────────┐
//! │ Length   │ Payload      │
//! │ 4 bytes  │ N bytes JSON │
//! │ uint32 BE│              │
//! └──────────┴──────────────┘
//! ```
//!
//! The prefix is Big Endian. There is no message-type information in the
//! frame itself; request/response discrimination lives in the payload.

use crate::error::{Result, WireError};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (1 MiB).
///
/// Command payloads are small JSON documents; anything near this limit
/// indicates a corrupted or hostile prefix and is treated as fatal.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_048_576;

/// Encode a payload as a complete frame (prefix + payload).
///
/// # Example
///
/// ```
/// use rasterwire::protocol::{encode_frame, LENGTH_PREFIX_SIZE};
///
/// let frame = encode_frame(b"{}");
/// assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + 2);
/// assert_eq!(&frame[..LENGTH_PREFIX_SIZE], &[0, 0, 0, 2]);
/// ```
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decode a length prefix from the start of `buf`.
///
/// Returns `None` if fewer than [`LENGTH_PREFIX_SIZE`] bytes are available.
pub fn decode_length(buf: &[u8]) -> Option<u32> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Validate a decoded payload length against the configured maximum.
///
/// An oversized length means the stream can no longer be trusted, so the
/// caller must close the connection on error.
pub fn validate_length(length: u32, max_payload_size: u32) -> Result<()> {
    if length > max_payload_size {
        return Err(WireError::Protocol(format!(
            "Payload size {} exceeds maximum {}",
            length, max_payload_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_prepends_length() {
        let frame = encode_frame(b"hello");
        assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + 5);
        assert_eq!(&frame[..LENGTH_PREFIX_SIZE], &[0, 0, 0, 5]);
        assert_eq!(&frame[LENGTH_PREFIX_SIZE..], b"hello");
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode_frame(b"");
        assert_eq!(frame, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_length_big_endian() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0xFF];
        assert_eq!(decode_length(&buf), Some(0x0102_0304));
    }

    #[test]
    fn test_decode_length_too_short() {
        assert_eq!(decode_length(&[0, 0, 0]), None);
        assert_eq!(decode_length(&[]), None);
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length(100, DEFAULT_MAX_PAYLOAD_SIZE).is_ok());
        assert!(validate_length(DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_PAYLOAD_SIZE).is_ok());

        let err = validate_length(101, 100).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_roundtrip() {
        let frame = encode_frame(b"{\"id\": 1}");
        let length = decode_length(&frame).unwrap() as usize;
        assert_eq!(&frame[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + length], b"{\"id\": 1}");
    }
}
