// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The `namespace` and `operation` a call was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub namespace: String,
    pub operation: String,
}

/// Call-scoped context: cancellation, an optional deadline, and the target
/// the call was addressed to.
///
/// Cloning is cheap. Children created with [`Context::with_timeout`] observe
/// the parent's cancellation, but cancelling a child leaves the parent alone.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    target: Option<Arc<Target>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled whenever `token` is.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            ..Self::default()
        }
    }

    /// A child context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
            target: self.target.clone(),
        }
    }

    /// A copy of this context addressed to `namespace`/`operation`.
    pub fn with_target(&self, namespace: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            target: Some(Arc::new(Target {
                namespace: namespace.into(),
                operation: operation.into(),
            })),
            ..self.clone()
        }
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }
}
