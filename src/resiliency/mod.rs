// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resiliency policies: timeouts, retries with backoff, circuit breakers.
//!
//! Policies are declared by name under `resiliency` in the configuration and
//! referenced from pipeline steps. Named retry configs and circuit breakers
//! are built once and shared (`Arc`) by every step that names them, so a
//! breaker trips for all of its users at once.

pub mod breaker;
mod policy;
pub mod retry;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker, Counts};
pub use policy::ResiliencyPolicy;
pub use retry::{notify_recover, Backoff, RetryConfig};
