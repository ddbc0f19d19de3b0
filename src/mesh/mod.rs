// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The mesh: a router that links one instance's imports to another
//! instance's exports.
//!
//! Exports are published in an [`ArcSwap`] snapshot, one swappable
//! [`Destination`] per `(namespace, operation)`. Dispatch only ever loads;
//! [`Mesh::link`] is the single writer.
//!
//! ```text
//!   importer ──(import index)──► forwarding handler
//!                                   │ load destination, rewrite index
//!                                   ▼
//!                               exporter ──(export index)──► runnable
//! ```
//!
//! Imports with no matching export are parked and retried after every link,
//! so instances can be linked in any order.

mod destination;
#[cfg(test)]
mod integration_tests;

pub use destination::Destination;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::compute::operations::{
    FireAndForgetHandler, RequestChannelHandler, RequestResponseHandler, RequestStreamHandler,
};
use crate::compute::{Flux, Mono, Operation, OperationType, Payload};
use crate::engine::Context;
use crate::errors::MeshError;
use crate::observability::messages::mesh::{
    ImportPending, ImportResolved, InstanceCloseFailed, InstanceLinked, RouteUnresolved,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Instance;
use destination::Slot;

/// `namespace -> operation -> destination`.
type ExportTable = HashMap<String, HashMap<String, Slot>>;

/// An import still waiting for a matching export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    pub instance: String,
    pub import: Operation,
}

struct Parked {
    instance: Arc<dyn Instance>,
    import: Operation,
}

#[derive(Default)]
struct LinkState {
    instances: Vec<Arc<dyn Instance>>,
    pending: Vec<Parked>,
    closed: bool,
}

pub struct Mesh {
    exports: ArcSwap<ExportTable>,
    state: Mutex<LinkState>,
    shutdown: CancellationToken,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            exports: ArcSwap::from_pointee(ExportTable::new()),
            state: Mutex::new(LinkState::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Publishes `instance`'s exports and binds its imports.
    ///
    /// Re-exporting an existing `(namespace, operation)` swaps its
    /// destination in place; calls already in flight finish against the old
    /// one. Imports that cannot be bound yet stay pending until a later link
    /// exports them.
    ///
    /// A closed mesh rejects new instances with [`MeshError::Closed`]; the
    /// caller keeps ownership of closing them.
    pub fn link(&self, instance: Arc<dyn Instance>) -> Result<(), MeshError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(MeshError::Closed);
        }

        let exports = self.publish_exports(&instance);
        let table = self.exports.load_full();

        // earlier imports first, then this instance's own
        state.pending.retain(|parked| !bind(&table, &parked.instance, &parked.import));
        let mut imports = 0;
        for import in instance.operations().imports() {
            imports += 1;
            if !bind(&table, &instance, import) {
                ImportPending {
                    instance: instance.name(),
                    namespace: &import.namespace,
                    operation: &import.operation,
                }
                .log();
                state.pending.push(Parked {
                    instance: instance.clone(),
                    import: import.clone(),
                });
            }
        }

        InstanceLinked {
            instance: instance.name(),
            exports,
            imports,
            pending: state.pending.len(),
        }
        .log();
        state.instances.push(instance);
        Ok(())
    }

    /// Stores a destination for every export, copying the table only when
    /// new keys appear. Returns the number of exported operations.
    fn publish_exports(&self, instance: &Arc<dyn Instance>) -> usize {
        let current = self.exports.load();
        let mut next: Option<ExportTable> = None;
        let mut count = 0;

        for export in instance.operations().exports() {
            count += 1;
            let destination = Arc::new(Destination::new(instance.clone(), export.index));
            let table = next.as_ref().unwrap_or(&**current);
            match table.get(&export.namespace).and_then(|ops| ops.get(&export.operation)) {
                Some(slot) => slot.store(destination),
                None => {
                    let next = next.get_or_insert_with(|| (**current).clone());
                    next.entry(export.namespace.clone())
                        .or_default()
                        .insert(export.operation.clone(), Arc::new(ArcSwap::new(destination)));
                }
            }
        }

        if let Some(next) = next {
            self.exports.store(Arc::new(next));
        }
        count
    }

    fn destination(&self, kind: OperationType, namespace: &str, operation: &str) -> Option<Arc<Destination>> {
        let exports = self.exports.load();
        match exports.get(namespace).and_then(|ops| ops.get(operation)) {
            Some(slot) => Some(slot.load_full()),
            None => {
                RouteUnresolved {
                    interaction: &kind.to_string(),
                    namespace,
                    operation,
                }
                .log();
                None
            }
        }
    }

    /// Returns `None` when nothing exports the operation.
    pub fn request_response(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
    ) -> Option<Mono> {
        self.destination(OperationType::RequestResponse, namespace, operation)
            .map(|destination| destination.request_response(ctx, payload))
    }

    /// Returns `false` when nothing exports the operation.
    pub fn fire_and_forget(&self, ctx: Context, namespace: &str, operation: &str, payload: Payload) -> bool {
        match self.destination(OperationType::FireAndForget, namespace, operation) {
            Some(destination) => {
                destination.fire_and_forget(ctx, payload);
                true
            }
            None => false,
        }
    }

    pub fn request_stream(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
    ) -> Option<Flux> {
        self.destination(OperationType::RequestStream, namespace, operation)
            .map(|destination| destination.request_stream(ctx, payload))
    }

    pub fn request_channel(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
        inbound: Flux,
    ) -> Option<Flux> {
        self.destination(OperationType::RequestChannel, namespace, operation)
            .map(|destination| destination.request_channel(ctx, payload, inbound))
    }

    /// Imports not yet bound to an export.
    pub fn pending(&self) -> Vec<PendingImport> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|parked| PendingImport {
                instance: parked.instance.name().to_string(),
                import: parked.import.clone(),
            })
            .collect()
    }

    /// Closes every linked instance, then releases [`Mesh::wait_until_shutdown`].
    ///
    /// Every instance is closed even when earlier ones fail; the failures are
    /// returned together. Closing again is a no-op.
    pub async fn close(&self) -> Result<(), MeshError> {
        let instances = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.pending.clear();
            std::mem::take(&mut state.instances)
        };

        let mut failures = Vec::new();
        for instance in instances {
            if let Err(error) = instance.close().await {
                InstanceCloseFailed {
                    instance: instance.name(),
                    error: &error,
                }
                .log();
                failures.push((instance.name().to_string(), error));
            }
        }

        self.shutdown.cancel();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MeshError::Close(failures))
        }
    }

    pub async fn wait_until_shutdown(&self) {
        self.shutdown.cancelled().await
    }
}

/// Installs a forwarding handler for `import` when something exports it.
fn bind(exports: &ExportTable, instance: &Arc<dyn Instance>, import: &Operation) -> bool {
    let Some(slot) = exports
        .get(&import.namespace)
        .and_then(|ops| ops.get(&import.operation))
        .cloned()
    else {
        return false;
    };

    {
        let destination = slot.load();
        ImportResolved {
            instance: instance.name(),
            namespace: &import.namespace,
            operation: &import.operation,
            target: destination.instance.name(),
            index: destination.index,
        }
        .log();
    }

    match import.kind {
        OperationType::RequestResponse => {
            let handler: RequestResponseHandler =
                Arc::new(move |ctx: Context, payload: Payload| slot.load().request_response(ctx, payload));
            instance.set_request_response_handler(import.index, handler);
        }
        OperationType::FireAndForget => {
            let handler: FireAndForgetHandler =
                Arc::new(move |ctx: Context, payload: Payload| slot.load().fire_and_forget(ctx, payload));
            instance.set_fire_and_forget_handler(import.index, handler);
        }
        OperationType::RequestStream => {
            let handler: RequestStreamHandler =
                Arc::new(move |ctx: Context, payload: Payload| slot.load().request_stream(ctx, payload));
            instance.set_request_stream_handler(import.index, handler);
        }
        OperationType::RequestChannel => {
            let handler: RequestChannelHandler = Arc::new(move |ctx: Context, payload: Payload, inbound: Flux| {
                slot.load().request_channel(ctx, payload, inbound)
            });
            instance.set_request_channel_handler(import.index, handler);
        }
    }
    true
}
