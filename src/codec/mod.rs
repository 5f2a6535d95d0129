//! Codec module - serialization/deserialization for frame payloads.
//!
//! The wire payload format is JSON. The codec is a marker struct with
//! static methods rather than a trait object, so the call sites stay
//! monomorphic and allocation-free on the decode path where possible.
//!
//! # Example
//!
//! ```
//! use rasterwire::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&"hello").unwrap();
//! let decoded: String = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod json;

pub use json::JsonCodec;
