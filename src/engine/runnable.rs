// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::{Context, Data};
use crate::errors::ExecutionError;
use crate::observability::messages::pipeline::{PipelineCompleted, PipelineFailed, PipelineStopped};
use crate::observability::messages::StructuredLog;
use crate::resiliency::ResiliencyPolicy;
use crate::traits::{Action, StepOutcome};

/// An action bound to its resiliency policy and output binding.
pub(crate) struct Step {
    pub(crate) name: String,
    pub(crate) action: Arc<dyn Action>,
    pub(crate) returns: Option<String>,
    pub(crate) policy: ResiliencyPolicy,
}

/// A compiled pipeline.
///
/// Runnables are immutable and cheap to clone; any number of invocations may
/// run the same runnable concurrently, each against its own [`Data`].
#[derive(Clone)]
pub struct Runnable {
    name: Arc<str>,
    steps: Arc<[Step]>,
}

impl Runnable {
    pub(crate) fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: Arc::from(name),
            steps: steps.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name.as_str())
    }

    /// Runs the steps in order against `data`.
    ///
    /// Each step runs under its own resiliency policy. A step that fails
    /// aborts the pipeline with its error; a step that stops ends the
    /// pipeline successfully. The result is the last executed step's value.
    pub async fn run(&self, ctx: &Context, data: &Data) -> Result<Value, ExecutionError> {
        let started = Instant::now();
        let mut output = Value::Null;

        for (position, step) in self.steps.iter().enumerate() {
            let outcome = step
                .policy
                .run(ctx, move |attempt| async move {
                    match step.action.run(&attempt, data).await {
                        StepOutcome::Fail(error) => Err(error),
                        outcome => Ok(outcome),
                    }
                })
                .await;

            match outcome {
                Ok(StepOutcome::Continue(value)) => {
                    if let Some(binding) = &step.returns {
                        data.insert(binding.clone(), value.clone());
                    }
                    output = value;
                }
                Ok(StepOutcome::Stop(value)) => {
                    if !value.is_null() {
                        output = value;
                    }
                    PipelineStopped {
                        name: &self.name,
                        step: &step.name,
                        skipped: self.steps.len() - position - 1,
                    }
                    .log();
                    return Ok(output);
                }
                Ok(StepOutcome::Fail(error)) | Err(error) => {
                    PipelineFailed {
                        name: &self.name,
                        step: &step.name,
                        error: &error,
                    }
                    .log();
                    return Err(error);
                }
            }
        }

        PipelineCompleted {
            name: &self.name,
            steps_run: self.steps.len(),
            duration: started.elapsed(),
        }
        .log();
        Ok(output)
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runnable")
            .field("name", &self.name)
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .finish()
    }
}
