// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for processor loading and pipeline execution events.
//!
//! This module contains message types for logging events related to:
//! * Compiling configuration into runnables
//! * Pipeline execution lifecycle (start, stop, completion, failure)

use crate::errors::ExecutionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// All configured functions were compiled.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_switchyard::observability::messages::pipeline::ProcessorLoaded;
///
/// let msg = ProcessorLoaded {
///     services: 4,
///     providers: 1,
///     events: 0,
///     pipelines: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ProcessorLoaded {
    pub services: usize,
    pub providers: usize,
    pub events: usize,
    pub pipelines: usize,
}

impl Display for ProcessorLoaded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor loaded: services={}, providers={}, events={}, pipelines={}",
            self.services, self.providers, self.events, self.pipelines
        )
    }
}

impl StructuredLog for ProcessorLoaded {
    fn log(&self) {
        tracing::info!(
            services = self.services,
            providers = self.providers,
            events = self.events,
            pipelines = self.pipelines,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "processor_loaded",
            span_name = name,
            services = self.services,
            providers = self.providers,
            events = self.events,
            pipelines = self.pipelines,
        )
    }
}

/// A pipeline invocation started.
///
/// # Log Level
/// `debug!` - Emitted once per call
pub struct PipelineStarted<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub step_count: usize,
}

impl Display for PipelineStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} pipeline '{}' with {} steps",
            self.kind, self.name, self.step_count
        )
    }
}

impl StructuredLog for PipelineStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            kind = self.kind,
            pipeline = self.name,
            step_count = self.step_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            kind = self.kind,
            pipeline = self.name,
            step_count = self.step_count,
        )
    }
}

/// A pipeline ran every step, or stopped early, without error.
///
/// # Log Level
/// `debug!` - Emitted once per call
pub struct PipelineCompleted<'a> {
    pub name: &'a str,
    pub steps_run: usize,
    pub duration: Duration,
}

impl Display for PipelineCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' completed: {} steps in {:?}",
            self.name, self.steps_run, self.duration
        )
    }
}

impl StructuredLog for PipelineCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline = self.name,
            steps_run = self.steps_run,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pipeline_completed",
            span_name = name,
            pipeline = self.name,
            steps_run = self.steps_run,
            duration = ?self.duration,
        )
    }
}

/// A step asked the pipeline to stop; remaining steps are skipped.
///
/// # Log Level
/// `debug!` - Normal control flow
///
/// # Example
/// ```
/// use the_switchyard::observability::messages::pipeline::PipelineStopped;
///
/// let msg = PipelineStopped {
///     name: "orders/create",
///     step: "only paid orders",
///     skipped: 2,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Pipeline 'orders/create' stopped at step 'only paid orders', skipping 2 steps"
/// );
/// ```
pub struct PipelineStopped<'a> {
    pub name: &'a str,
    pub step: &'a str,
    pub skipped: usize,
}

impl Display for PipelineStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' stopped at step '{}', skipping {} steps",
            self.name, self.step, self.skipped
        )
    }
}

impl StructuredLog for PipelineStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline = self.name,
            step = self.step,
            skipped = self.skipped,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pipeline_stopped",
            span_name = name,
            pipeline = self.name,
            step = self.step,
        )
    }
}

/// A step failed and aborted its pipeline.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct PipelineFailed<'a> {
    pub name: &'a str,
    pub step: &'a str,
    pub error: &'a ExecutionError,
}

impl Display for PipelineFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' failed at step '{}': {}",
            self.name, self.step, self.error
        )
    }
}

impl StructuredLog for PipelineFailed<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline = self.name,
            step = self.step,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "pipeline_failed",
            span_name = name,
            pipeline = self.name,
            step = self.step,
        )
    }
}
