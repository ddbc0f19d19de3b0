// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::ExecutionError;

/// Converts between payload bytes and values.
pub trait Codec: Send + Sync {
    /// The MIME type this codec reads and writes.
    fn content_type(&self) -> &'static str;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, ExecutionError>;

    /// Decodes `bytes`, also returning the payload's type name when the
    /// format carries one.
    fn decode(&self, bytes: &[u8]) -> Result<(Value, Option<String>), ExecutionError>;
}
