//! Protocol module - wire format, framing, and message envelopes.
//!
//! This module implements the framed stream protocol:
//! - 4-byte big-endian length prefix encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Request/response envelope types and reply correlation

mod frame_buffer;
mod message;
mod wire_format;

pub use frame_buffer::FrameBuffer;
pub use message::{
    is_version_string, match_reply, Operation, Request, Response, ENVELOPE_KEYS,
    PROTOCOL_VERSION, SERVER_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
pub use wire_format::{
    decode_length, encode_frame, validate_length, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE,
};
