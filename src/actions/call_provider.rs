// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::consts::PROCESSOR_DEPENDENCY;
use crate::engine::{decode_with, Context, Data, LoadContext, ProcessorHandle};
use crate::errors::ConfigError;
use crate::traits::{Action, StepOutcome};

/// # Example
/// ```yaml
/// uses: call_provider
/// with:
///   namespace: payments.v1.Ledger
///   operation: charge
/// ```
#[derive(Debug, Deserialize)]
pub struct CallProviderConfig {
    /// `namespace.service`, split at the last `.`.
    pub namespace: String,
    pub operation: String,
}

/// Runs a provider function against the caller's `Data`.
pub struct CallProvider {
    namespace: String,
    service: String,
    operation: String,
    processor: Arc<ProcessorHandle>,
}

pub(crate) fn load(with: Option<&Value>, load: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config: CallProviderConfig = decode_with("call_provider", with)?;
    let (namespace, service) = config
        .namespace
        .rsplit_once('.')
        .filter(|(namespace, service)| !namespace.is_empty() && !service.is_empty())
        .ok_or_else(|| {
            ConfigError::invalid_action(
                "call_provider",
                format!("namespace '{}' is not of the form 'namespace.service'", config.namespace),
            )
        })?;

    Ok(Arc::new(CallProvider {
        namespace: namespace.to_string(),
        service: service.to_string(),
        operation: config.operation,
        processor: load.resolve::<ProcessorHandle>(PROCESSOR_DEPENDENCY)?,
    }))
}

#[async_trait]
impl Action for CallProvider {
    async fn run(&self, ctx: &Context, data: &Data) -> StepOutcome {
        self.processor
            .provider(ctx, &self.namespace, &self.service, &self.operation, data)
            .await
            .into()
    }
}
