// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::{Context, Data};
use crate::errors::ExecutionError;

/// What a step tells the pipeline after it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Keep going; the value is the step's result.
    Continue(Value),
    /// End the pipeline successfully and skip the remaining steps. A
    /// non-null value replaces the pipeline's result.
    Stop(Value),
    /// Abort the pipeline, subject to the step's retry policy.
    Fail(ExecutionError),
}

impl From<Result<Value, ExecutionError>> for StepOutcome {
    fn from(result: Result<Value, ExecutionError>) -> Self {
        match result {
            Ok(value) => StepOutcome::Continue(value),
            Err(error) => StepOutcome::Fail(error),
        }
    }
}

/// One configured unit of pipeline work.
///
/// Actions are built once by their loader and then run concurrently by any
/// number of invocations, each with its own [`Data`].
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, ctx: &Context, data: &Data) -> StepOutcome;
}
