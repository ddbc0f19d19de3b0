// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::ExecutionError;
use crate::traits::Codec;

/// `application/json` via `serde_json`. JSON carries no type name.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, ExecutionError> {
        serde_json::to_vec(value).map_err(|e| ExecutionError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<(Value, Option<String>), ExecutionError> {
        let value = serde_json::from_slice(bytes).map_err(|e| ExecutionError::Codec(e.to_string()))?;
        Ok((value, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_object() {
        let (value, type_name) = JsonCodec.decode(br#"{"name":"Ada","tags":[1,2]}"#).unwrap();
        assert_eq!(value, json!({"name": "Ada", "tags": [1, 2]}));
        assert_eq!(type_name, None);
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        let err = JsonCodec.decode(b"{not json").unwrap_err();
        assert!(matches!(err, ExecutionError::Codec(_)));
    }

    #[test]
    fn test_encode_is_compact() {
        let bytes = JsonCodec.encode(&json!({"a": [true, null]})).unwrap();
        assert_eq!(bytes, br#"{"a":[true,null]}"#);
    }
}
