// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::compute::ImportClient;
use crate::config::consts::INVOKER_DEPENDENCY;
use crate::engine::{decode_with, Context, Data, LoadContext, INPUT};
use crate::errors::{ConfigError, ExecutionError};
use crate::expr::Expr;
use crate::traits::{Action, StepOutcome};

/// Omitted `namespace` or `operation` default to the target of the call
/// being processed, so a service can forward to an identically named import.
///
/// # Example
/// ```yaml
/// uses: invoke
/// with:
///   namespace: inventory.v1.Stock
///   operation: reserve
///   input: "{sku: input.sku, quantity: input.quantity}"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct InvokeConfig {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub input: Option<Expr>,
}

/// Calls an imported operation through the mesh, request-response.
pub struct Invoke {
    config: InvokeConfig,
    client: Arc<ImportClient>,
}

pub(crate) fn load(with: Option<&Value>, load: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config = decode_with("invoke", with)?;
    let client = load.resolve::<ImportClient>(INVOKER_DEPENDENCY)?;
    Ok(Arc::new(Invoke { config, client }))
}

impl Invoke {
    async fn invoke(&self, ctx: &Context, data: &Data) -> Result<Value, ExecutionError> {
        let input = match &self.config.input {
            Some(expr) => data.eval(expr)?,
            None => data.get(INPUT).unwrap_or(Value::Null),
        };
        // raw JSON text is sent as the value it encodes
        let input = match input {
            Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            other => other,
        };

        let target = ctx.target();
        let namespace = self
            .config
            .namespace
            .as_deref()
            .or(target.map(|t| t.namespace.as_str()));
        let operation = self
            .config
            .operation
            .as_deref()
            .or(target.map(|t| t.operation.as_str()));
        let (Some(namespace), Some(operation)) = (namespace, operation) else {
            return Err(ExecutionError::permanent(ExecutionError::action(
                "invoke needs a namespace and operation",
            )));
        };

        self.client
            .request_response(ctx, namespace, operation, &input)
            .await
    }
}

#[async_trait]
impl Action for Invoke {
    async fn run(&self, ctx: &Context, data: &Data) -> StepOutcome {
        self.invoke(ctx, data).await.into()
    }
}
