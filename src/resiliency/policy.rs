// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Context;
use crate::errors::ExecutionError;
use crate::observability::messages::resiliency::{OperationRecovered, OperationRetrying};
use crate::observability::messages::StructuredLog;
use crate::resiliency::breaker::CircuitBreaker;
use crate::resiliency::retry::{notify_recover, RetryConfig};

/// Timeout, retry and circuit breaker composed around one operation.
///
/// The layers nest in a fixed order:
///
/// ```text
/// breaker( retry( timeout( op ) ) )
/// ```
///
/// so the breaker sees one outcome per policy run, however many attempts the
/// retry layer made, and each attempt gets its own timeout.
#[derive(Debug, Clone, Default)]
pub struct ResiliencyPolicy {
    pub name: String,
    pub timeout: Option<Duration>,
    pub retry: Option<Arc<RetryConfig>>,
    pub circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl ResiliencyPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: Arc<RetryConfig>) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Runs `op` under this policy.
    ///
    /// `op` receives the context for one attempt, carrying that attempt's
    /// deadline when a timeout is configured. Permanent errors are returned
    /// unwrapped.
    pub async fn run<F, Fut, T>(&self, ctx: &Context, mut op: F) -> Result<T, ExecutionError>
    where
        F: FnMut(Context) -> Fut,
        Fut: Future<Output = Result<T, ExecutionError>>,
    {
        let timeout = self.timeout;
        let mut attempt = || {
            let attempt_ctx = match timeout {
                Some(t) => ctx.with_timeout(t),
                None => ctx.clone(),
            };
            bounded(ctx, timeout, op(attempt_ctx))
        };

        let retried = async {
            let Some(retry) = &self.retry else {
                return attempt().await;
            };

            let mut backoff = retry.backoff();
            let failures = AtomicU32::new(0);
            notify_recover(
                ctx,
                &mut attempt,
                backoff.as_mut(),
                |error, delay| {
                    let attempt = failures.fetch_add(1, Ordering::Relaxed) + 1;
                    OperationRetrying {
                        operation: &self.name,
                        attempt,
                        delay,
                        error,
                    }
                    .log();
                },
                || {
                    OperationRecovered {
                        operation: &self.name,
                        failed_attempts: failures.load(Ordering::Relaxed),
                    }
                    .log();
                },
            )
            .await
        };

        let result = match &self.circuit_breaker {
            Some(breaker) => breaker.execute(|| retried).await,
            None => retried.await,
        };
        result.map_err(ExecutionError::into_inner)
    }
}

/// Applies the attempt timeout and races the caller's cancellation.
async fn bounded<T>(
    ctx: &Context,
    timeout: Option<Duration>,
    attempt: impl Future<Output = Result<T, ExecutionError>>,
) -> Result<T, ExecutionError> {
    let limited = async {
        match timeout {
            Some(t) => tokio::time::timeout(t, attempt)
                .await
                .unwrap_or(Err(ExecutionError::Timeout(t))),
            None => attempt.await,
        }
    };

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ExecutionError::Cancelled),
        result = limited => result,
    }
}
