// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for retries and circuit breakers.

use crate::errors::ExecutionError;
use crate::observability::messages::StructuredLog;
use crate::resiliency::BreakerState;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// An attempt failed and will be retried after `delay`.
///
/// # Log Level
/// `warn!` - Degraded but recovering
///
/// # Example
/// ```
/// use the_switchyard::errors::ExecutionError;
/// use the_switchyard::observability::messages::resiliency::OperationRetrying;
/// use std::time::Duration;
///
/// let error = ExecutionError::action("connection refused");
/// let msg = OperationRetrying {
///     operation: "save order",
///     attempt: 1,
///     delay: Duration::from_millis(500),
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct OperationRetrying<'a> {
    pub operation: &'a str,
    pub attempt: u32,
    pub delay: Duration,
    pub error: &'a ExecutionError,
}

impl Display for OperationRetrying<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Error processing operation '{}' (attempt {}): {}. Retrying in {:?}",
            self.operation, self.attempt, self.error, self.delay
        )
    }
}

impl StructuredLog for OperationRetrying<'_> {
    fn log(&self) {
        tracing::warn!(
            operation = self.operation,
            attempt = self.attempt,
            delay_ms = self.delay.as_millis() as u64,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "operation_retrying",
            span_name = name,
            operation = self.operation,
            attempt = self.attempt,
        )
    }
}

/// An operation succeeded after one or more failed attempts.
///
/// # Log Level
/// `info!` - Important operational event
pub struct OperationRecovered<'a> {
    pub operation: &'a str,
    pub failed_attempts: u32,
}

impl Display for OperationRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Recovered processing operation '{}' after {} failed attempts",
            self.operation, self.failed_attempts
        )
    }
}

impl StructuredLog for OperationRecovered<'_> {
    fn log(&self) {
        tracing::info!(
            operation = self.operation,
            failed_attempts = self.failed_attempts,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "operation_recovered",
            span_name = name,
            operation = self.operation,
            failed_attempts = self.failed_attempts,
        )
    }
}

/// A circuit breaker moved between states.
///
/// # Log Level
/// `warn!` when opening, `info!` otherwise
///
/// # Example
/// ```
/// use the_switchyard::observability::messages::resiliency::BreakerStateChanged;
/// use the_switchyard::resiliency::BreakerState;
///
/// let msg = BreakerStateChanged {
///     breaker: "database",
///     from: BreakerState::Closed,
///     to: BreakerState::Open,
/// };
///
/// assert_eq!(msg.to_string(), "Circuit breaker 'database' changed from closed to open");
/// ```
pub struct BreakerStateChanged<'a> {
    pub breaker: &'a str,
    pub from: BreakerState,
    pub to: BreakerState,
}

impl Display for BreakerStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Circuit breaker '{}' changed from {} to {}",
            self.breaker, self.from, self.to
        )
    }
}

impl StructuredLog for BreakerStateChanged<'_> {
    fn log(&self) {
        let from = self.from.to_string();
        let to = self.to.to_string();
        if self.to == BreakerState::Open {
            tracing::warn!(breaker = self.breaker, from = %from, to = %to, "{}", self);
        } else {
            tracing::info!(breaker = self.breaker, from = %from, to = %to, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "breaker_state_changed",
            span_name = name,
            breaker = self.breaker,
            from = %self.from,
            to = %self.to,
        )
    }
}
