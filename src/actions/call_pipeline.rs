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

#[derive(Debug, Deserialize)]
pub struct CallPipelineConfig {
    pub name: String,
}

/// Runs a named pipeline against the caller's `Data`.
pub struct CallPipeline {
    name: String,
    processor: Arc<ProcessorHandle>,
}

pub(crate) fn load(with: Option<&Value>, load: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config: CallPipelineConfig = decode_with("call_pipeline", with)?;
    let processor = load.resolve::<ProcessorHandle>(PROCESSOR_DEPENDENCY)?;
    Ok(Arc::new(CallPipeline {
        name: config.name,
        processor,
    }))
}

#[async_trait]
impl Action for CallPipeline {
    async fn run(&self, ctx: &Context, data: &Data) -> StepOutcome {
        self.processor.pipeline(ctx, &self.name, data).await.into()
    }
}
