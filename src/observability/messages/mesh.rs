// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for mesh linking and dispatch events.
//!
//! This module contains message types for logging events related to:
//! * Linking instances and publishing their exports
//! * Resolving imports, immediately or retroactively
//! * Dispatch misses and instance shutdown

use crate::errors::ExecutionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An instance was linked into the mesh.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_switchyard::observability::messages::mesh::InstanceLinked;
///
/// let msg = InstanceLinked {
///     instance: "orders",
///     exports: 3,
///     imports: 1,
///     pending: 0,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct InstanceLinked<'a> {
    pub instance: &'a str,
    pub exports: usize,
    pub imports: usize,
    pub pending: usize,
}

impl Display for InstanceLinked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Linked instance '{}': {} exports, {} imports, {} imports pending",
            self.instance, self.exports, self.imports, self.pending
        )
    }
}

impl StructuredLog for InstanceLinked<'_> {
    fn log(&self) {
        tracing::info!(
            instance = self.instance,
            exports = self.exports,
            imports = self.imports,
            pending = self.pending,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "link",
            span_name = name,
            instance = self.instance,
            exports = self.exports,
            imports = self.imports,
        )
    }
}

/// An import was bound to an export.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ImportResolved<'a> {
    pub instance: &'a str,
    pub namespace: &'a str,
    pub operation: &'a str,
    pub target: &'a str,
    pub index: u32,
}

impl Display for ImportResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Import {}/{} of '{}' resolved to '{}' at index {}",
            self.namespace, self.operation, self.instance, self.target, self.index
        )
    }
}

impl StructuredLog for ImportResolved<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = self.instance,
            namespace = self.namespace,
            operation = self.operation,
            target = self.target,
            index = self.index,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "import_resolved",
            span_name = name,
            namespace = self.namespace,
            operation = self.operation,
        )
    }
}

/// An import has no matching export yet and was parked.
///
/// # Log Level
/// `debug!` - Expected while instances are linked out of order
pub struct ImportPending<'a> {
    pub instance: &'a str,
    pub namespace: &'a str,
    pub operation: &'a str,
}

impl Display for ImportPending<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Import {}/{} of '{}' has no export yet; pending",
            self.namespace, self.operation, self.instance
        )
    }
}

impl StructuredLog for ImportPending<'_> {
    fn log(&self) {
        tracing::debug!(
            instance = self.instance,
            namespace = self.namespace,
            operation = self.operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "import_pending",
            span_name = name,
            namespace = self.namespace,
            operation = self.operation,
        )
    }
}

/// A dispatch found no export for the requested operation.
///
/// # Log Level
/// `debug!` - The call is dropped without a result
pub struct RouteUnresolved<'a> {
    pub interaction: &'a str,
    pub namespace: &'a str,
    pub operation: &'a str,
}

impl Display for RouteUnresolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No export for {} {}/{}; dropping call",
            self.interaction, self.namespace, self.operation
        )
    }
}

impl StructuredLog for RouteUnresolved<'_> {
    fn log(&self) {
        tracing::debug!(
            interaction = self.interaction,
            namespace = self.namespace,
            operation = self.operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "route_unresolved",
            span_name = name,
            namespace = self.namespace,
            operation = self.operation,
        )
    }
}

/// A linked instance reported an error while closing.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct InstanceCloseFailed<'a> {
    pub instance: &'a str,
    pub error: &'a ExecutionError,
}

impl Display for InstanceCloseFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Instance '{}' failed to close: {}", self.instance, self.error)
    }
}

impl StructuredLog for InstanceCloseFailed<'_> {
    fn log(&self) {
        tracing::error!(instance = self.instance, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("instance_close_failed", span_name = name, instance = self.instance)
    }
}

/// A fire-and-forget invocation failed after the caller moved on.
///
/// # Log Level
/// `warn!` - Nobody else will see the error
pub struct InvocationFailed<'a> {
    pub instance: &'a str,
    pub namespace: &'a str,
    pub operation: &'a str,
    pub error: &'a ExecutionError,
}

impl Display for InvocationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Fire-and-forget {}/{} on '{}' failed: {}",
            self.namespace, self.operation, self.instance, self.error
        )
    }
}

impl StructuredLog for InvocationFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            instance = self.instance,
            namespace = self.namespace,
            operation = self.operation,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "invocation_failed",
            span_name = name,
            namespace = self.namespace,
            operation = self.operation,
        )
    }
}
