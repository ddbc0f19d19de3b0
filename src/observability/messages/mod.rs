// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit that line together with its fields at the level
//! documented on the type.
//!
//! # Organization
//!
//! * `pipeline` - processor loading and pipeline lifecycle
//! * `resiliency` - retries and circuit breakers
//! * `mesh` - linking and dispatch
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_switchyard::observability::messages::pipeline::PipelineStarted;
//!
//! let msg = PipelineStarted {
//!     kind: "service",
//!     name: "greeting.v1.Greeter/sayHello",
//!     step_count: 3,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod mesh;
pub mod pipeline;
pub mod resiliency;

/// Emits a message as a structured tracing event or opens a span for it.
pub trait StructuredLog {
    /// Logs the message at its documented level with its fields attached.
    fn log(&self);

    /// Creates a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
