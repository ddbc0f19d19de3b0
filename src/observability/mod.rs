// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic the switchyard emits goes through a message struct with a
//! `Display` implementation rather than an inline format string, so the text
//! of each event lives in exactly one place.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::pipeline` - processor loading and pipeline execution events
//! * `messages::resiliency` - retry attempts, recoveries and breaker transitions
//! * `messages::mesh` - instance linking, import resolution and routing events
//!
//! # Usage
//!
//! ```rust
//! use the_switchyard::observability::messages::resiliency::OperationRecovered;
//! use the_switchyard::observability::messages::StructuredLog;
//!
//! let msg = OperationRecovered {
//!     operation: "save order",
//!     failed_attempts: 2,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
