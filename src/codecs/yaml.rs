// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::ExecutionError;
use crate::traits::Codec;

/// `application/yaml` via `serde_yaml`, decoded into the same JSON value
/// model the rest of the pipeline works with.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn content_type(&self) -> &'static str {
        "application/yaml"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, ExecutionError> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| ExecutionError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<(Value, Option<String>), ExecutionError> {
        let value = serde_yaml::from_slice(bytes).map_err(|e| ExecutionError::Codec(e.to_string()))?;
        Ok((value, None))
    }
}
