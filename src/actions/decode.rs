// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::codecs::Codecs;
use crate::config::consts::CODEC_LOOKUP_DEPENDENCY;
use crate::engine::{decode_with, Context, Data, LoadContext, INPUT};
use crate::errors::{ConfigError, ExecutionError};
use crate::traits::{Action, Codec, StepOutcome};

/// # Example
/// ```yaml
/// uses: decode
/// with:
///   codec: json
///   dataField: body
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeConfig {
    pub codec: String,
    #[serde(default = "default_data_field")]
    pub data_field: String,
    #[serde(default = "default_type_field")]
    pub type_field: String,
}

fn default_data_field() -> String {
    INPUT.to_string()
}

fn default_type_field() -> String {
    "type".to_string()
}

/// Decodes raw bytes in `dataField` in place, recording the type name in
/// `typeField` when the codec reports one.
pub struct Decode {
    config: DecodeConfig,
    codec: Arc<dyn Codec>,
}

pub(crate) fn load(with: Option<&Value>, load: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config: DecodeConfig = decode_with("decode", with)?;
    let codecs = load.resolve::<Codecs>(CODEC_LOOKUP_DEPENDENCY)?;
    let codec = codecs
        .get(&config.codec)
        .ok_or_else(|| ConfigError::invalid_action("decode", format!("unknown codec '{}'", config.codec)))?;
    Ok(Arc::new(Decode { config, codec }))
}

impl Decode {
    fn decode(&self, data: &Data) -> Result<Value, ExecutionError> {
        let Some(current) = data.get(&self.config.data_field) else {
            return Ok(Value::Null);
        };

        let bytes = raw_bytes(current).ok_or_else(|| {
            ExecutionError::permanent(ExecutionError::Codec(format!(
                "'{}' holds neither a string nor bytes",
                self.config.data_field
            )))
        })?;
        let (decoded, type_name) = self.codec.decode(&bytes).map_err(ExecutionError::permanent)?;

        if let Some(type_name) = type_name.filter(|name| !name.is_empty()) {
            data.insert(self.config.type_field.clone(), Value::String(type_name));
        }
        data.insert(self.config.data_field.clone(), decoded.clone());
        Ok(decoded)
    }
}

#[async_trait]
impl Action for Decode {
    async fn run(&self, _ctx: &Context, data: &Data) -> StepOutcome {
        self.decode(data).into()
    }
}

/// Strings decode from their UTF-8 bytes; arrays of byte values decode from
/// those bytes.
fn raw_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => Some(s.into_bytes()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::JsonCodec;
    use serde_json::json;

    fn decode(data_field: &str) -> Decode {
        Decode {
            config: decode_with("decode", Some(&json!({"codec": "json", "dataField": data_field}))).unwrap(),
            codec: Arc::new(JsonCodec),
        }
    }

    #[test]
    fn test_defaults() {
        let config: DecodeConfig = decode_with("decode", Some(&json!({"codec": "json"}))).unwrap();
        assert_eq!(config.data_field, "input");
        assert_eq!(config.type_field, "type");
    }

    #[tokio::test]
    async fn test_decodes_string_in_place() {
        let data = Data::with_input(json!(r#"{"id": 7}"#));
        let outcome = decode("input").run(&Context::new(), &data).await;

        assert_eq!(outcome, StepOutcome::Continue(json!({"id": 7})));
        assert_eq!(data.get("input"), Some(json!({"id": 7})));
        // JSON reports no type name
        assert!(!data.contains_key("type"));
    }

    #[tokio::test]
    async fn test_decodes_byte_array() {
        let data = Data::new();
        data.insert("body", json!([91, 49, 44, 50, 93]));
        let outcome = decode("body").run(&Context::new(), &data).await;
        assert_eq!(outcome, StepOutcome::Continue(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_missing_field_is_a_no_op() {
        let data = Data::new();
        let outcome = decode("body").run(&Context::new(), &data).await;
        assert_eq!(outcome, StepOutcome::Continue(Value::Null));
        assert!(!data.contains_key("body"));
    }

    #[tokio::test]
    async fn test_undecodable_value_fails_permanently() {
        let data = Data::with_input(json!({"already": "decoded"}));
        let outcome = decode("input").run(&Context::new(), &data).await;
        assert!(matches!(outcome, StepOutcome::Fail(e) if e.is_permanent()));
    }
}
