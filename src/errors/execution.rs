// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Call-time errors for pipeline execution and mesh dispatch.

use std::time::Duration;
use thiserror::Error;

use crate::expr::ExprError;

/// Errors raised while running a pipeline or dispatching through an instance.
///
/// `ExecutionError` is `Clone` so that a single failure can be fanned out to
/// several observers (retry notify hooks, log messages, the caller).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// An action failed. Transient and retry-eligible.
    #[error("action failed: {0}")]
    Action(String),

    /// An expression failed while being evaluated against `Data`.
    #[error("expression error: {0}")]
    Expression(#[from] ExprError),

    /// Marks the wrapped error as not retryable.
    #[error("{0}")]
    Permanent(Box<ExecutionError>),

    /// A step attempt exceeded its timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The named circuit breaker is open and rejected the call.
    #[error("circuit breaker '{0}' is open")]
    BreakerOpen(String),

    /// The named circuit breaker is half-open and its probe budget is spent.
    #[error("circuit breaker '{0}': too many requests")]
    TooManyRequests(String),

    /// No provider, event or named pipeline matched the lookup.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// An instance received an operation index it does not know.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// An import has not been linked to any export yet.
    #[error("no route for '{namespace}/{operation}'")]
    Unroutable { namespace: String, operation: String },

    /// Encoding or decoding a payload failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The processor backing a handle has been dropped.
    #[error("processor is no longer available")]
    ProcessorGone,
}

impl ExecutionError {
    /// Creates a transient action failure.
    pub fn action(message: impl ToString) -> Self {
        ExecutionError::Action(message.to_string())
    }

    /// Wraps `err` so retry loops give up immediately.
    pub fn permanent(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Permanent(_) => err,
            other => ExecutionError::Permanent(Box::new(other)),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, ExecutionError::Permanent(_))
    }

    /// Strips a permanent marking, returning the underlying error.
    pub fn into_inner(self) -> ExecutionError {
        match self {
            ExecutionError::Permanent(inner) => inner.into_inner(),
            other => other,
        }
    }
}
