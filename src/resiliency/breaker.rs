// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Generation-based circuit breaker.
//!
//! The breaker counts requests and outcomes per *generation*. A generation
//! ends on every state change and, while closed, every `interval`. Outcomes
//! reported for a generation that has already ended are ignored, so a slow
//! call that started before the breaker opened cannot close it again.
//!
//! ```text
//!            trip(counts)                timeout elapsed
//!   Closed ───────────────▶ Open ─────────────────────────▶ HalfOpen
//!     ▲                      ▲                                  │
//!     │                      └──────────── any failure ─────────┤
//!     └──────────────── max_requests consecutive successes ─────┘
//! ```

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::duration::deserialize_optional;
use crate::errors::ExecutionError;
use crate::expr::Expr;
use crate::observability::messages::resiliency::BreakerStateChanged;
use crate::observability::messages::StructuredLog;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONSECUTIVE_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    HalfOpen,
    Open,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BreakerState::Closed => "closed",
            BreakerState::HalfOpen => "half-open",
            BreakerState::Open => "open",
        })
    }
}

/// Request and outcome counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    /// The scope trip expressions are evaluated against.
    fn to_scope(self) -> Map<String, Value> {
        let mut scope = Map::new();
        scope.insert("requests".to_string(), Value::from(self.requests));
        scope.insert("totalSuccesses".to_string(), Value::from(self.total_successes));
        scope.insert("totalFailures".to_string(), Value::from(self.total_failures));
        scope.insert(
            "consecutiveSuccesses".to_string(),
            Value::from(self.consecutive_successes),
        );
        scope.insert(
            "consecutiveFailures".to_string(),
            Value::from(self.consecutive_failures),
        );
        scope
    }
}

/// Breaker settings as they appear under `resiliency.circuitBreakers`.
///
/// # Example
/// ```yaml
/// circuitBreakers:
///   database:
///     maxRequests: 2
///     interval: 30s
///     timeout: 10s
///     trip: "consecutiveFailures > 5"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerConfig {
    /// Probes allowed through while half-open. `0` means one.
    #[serde(default)]
    pub max_requests: u32,
    /// How often counts reset while closed. Absent or zero never resets.
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub interval: Option<Duration>,
    /// How long the breaker stays open. Absent or zero means 60s.
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub timeout: Option<Duration>,
    /// Trip predicate over [`Counts`]. Defaults to `consecutiveFailures > 5`.
    #[serde(default)]
    pub trip: Option<Expr>,
}

struct BreakerInner {
    state: BreakerState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

/// A named circuit breaker shared by every step that references it.
pub struct CircuitBreaker {
    name: String,
    max_requests: u32,
    interval: Duration,
    timeout: Duration,
    trip: Option<Expr>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let interval = config.interval.unwrap_or_default();
        let now = Instant::now();
        Self {
            name: name.into(),
            max_requests: config.max_requests.max(1),
            interval,
            timeout: config
                .timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(DEFAULT_TIMEOUT),
            trip: config.trip,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry: (!interval.is_zero()).then(|| now + interval),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state, applying any expired open or interval timer first.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.current_state(&mut inner, Instant::now());
        inner.state
    }

    pub fn counts(&self) -> Counts {
        let mut inner = self.inner.lock();
        self.current_state(&mut inner, Instant::now());
        inner.counts
    }

    /// Runs `op` if the breaker admits it and records the outcome.
    ///
    /// Rejected calls return [`ExecutionError::BreakerOpen`] or, while
    /// half-open with the probe budget spent,
    /// [`ExecutionError::TooManyRequests`]. `op` is not invoked in either
    /// case. A call dropped before completing counts as a failure.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<T, ExecutionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ExecutionError>>,
    {
        let generation = self.before_request()?;
        let mut guard = Outcome {
            breaker: self,
            generation,
            reported: false,
        };
        let result = op().await;
        guard.report(result.is_ok());
        result
    }

    fn before_request(&self) -> Result<u64, ExecutionError> {
        let mut inner = self.inner.lock();
        self.current_state(&mut inner, Instant::now());

        match inner.state {
            BreakerState::Open => return Err(ExecutionError::BreakerOpen(self.name.clone())),
            BreakerState::HalfOpen if inner.counts.requests >= self.max_requests => {
                return Err(ExecutionError::TooManyRequests(self.name.clone()))
            }
            _ => {}
        }

        inner.counts.on_request();
        Ok(inner.generation)
    }

    fn after_request(&self, before: u64, success: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        self.current_state(&mut inner, now);
        if inner.generation != before {
            return;
        }

        if success {
            self.on_success(&mut inner, now);
        } else {
            self.on_failure(&mut inner, now);
        }
    }

    fn on_success(&self, inner: &mut BreakerInner, now: Instant) {
        match inner.state {
            BreakerState::Closed => inner.counts.on_success(),
            BreakerState::HalfOpen => {
                inner.counts.on_success();
                if inner.counts.consecutive_successes >= self.max_requests {
                    self.set_state(inner, BreakerState::Closed, now);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn on_failure(&self, inner: &mut BreakerInner, now: Instant) {
        match inner.state {
            BreakerState::Closed => {
                inner.counts.on_failure();
                if self.ready_to_trip(inner.counts) {
                    self.set_state(inner, BreakerState::Open, now);
                }
            }
            BreakerState::HalfOpen => self.set_state(inner, BreakerState::Open, now),
            BreakerState::Open => {}
        }
    }

    /// Evaluation errors and non-boolean results never trip the breaker.
    fn ready_to_trip(&self, counts: Counts) -> bool {
        match &self.trip {
            Some(trip) => matches!(trip.eval(&counts.to_scope()), Ok(Value::Bool(true))),
            None => counts.consecutive_failures > DEFAULT_CONSECUTIVE_FAILURES,
        }
    }

    fn current_state(&self, inner: &mut BreakerInner, now: Instant) {
        let expired = inner.expiry.is_some_and(|expiry| expiry <= now);
        match inner.state {
            BreakerState::Closed if expired => self.new_generation(inner, now),
            BreakerState::Open if expired => self.set_state(inner, BreakerState::HalfOpen, now),
            _ => {}
        }
    }

    fn set_state(&self, inner: &mut BreakerInner, state: BreakerState, now: Instant) {
        if inner.state == state {
            return;
        }
        let previous = inner.state;
        inner.state = state;
        self.new_generation(inner, now);

        BreakerStateChanged {
            breaker: &self.name,
            from: previous,
            to: state,
        }
        .log();
    }

    fn new_generation(&self, inner: &mut BreakerInner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counts = Counts::default();
        inner.expiry = match inner.state {
            BreakerState::Closed => (!self.interval.is_zero()).then(|| now + self.interval),
            BreakerState::Open => Some(now + self.timeout),
            BreakerState::HalfOpen => None,
        };
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("trip", &self.trip)
            .finish()
    }
}

/// Records a failure for calls that never report, e.g. a future dropped on
/// timeout or cancellation.
struct Outcome<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    reported: bool,
}

impl Outcome<'_> {
    fn report(&mut self, success: bool) {
        self.reported = true;
        self.breaker.after_request(self.generation, success);
    }
}

impl Drop for Outcome<'_> {
    fn drop(&mut self) {
        if !self.reported {
            self.breaker.after_request(self.generation, false);
        }
    }
}
