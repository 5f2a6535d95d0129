//! JSON codec using `serde_json`.

use serde_json::Value;

use crate::error::Result;

/// JSON codec for structured payloads.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid JSON for type T. At the
    /// transport layer this error is connection-fatal.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode JSON bytes into an untyped document.
    ///
    /// The validator inspects raw documents before any typed parse so that
    /// unknown/missing envelope keys can be echoed back verbatim.
    #[inline]
    pub fn decode_value(bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestStruct {
        id: u32,
        name: String,
        active: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = TestStruct {
            id: 42,
            name: "test".to_string(),
            active: true,
        };

        let encoded = JsonCodec::encode(&original).unwrap();
        let decoded: TestStruct = JsonCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_value() {
        let value = JsonCodec::decode_value(br#"{"operation": "ping"}"#).unwrap();
        assert_eq!(value, json!({"operation": "ping"}));
    }

    #[test]
    fn test_decode_invalid_json_is_error() {
        assert!(JsonCodec::decode_value(br#"{{"key": "str }"#).is_err());
        assert!(JsonCodec::decode_value(b"").is_err());
    }
}
