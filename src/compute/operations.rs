// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operation tables and the handler tables imports are bound through.

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::compute::payload::Payload;
use crate::engine::Context;
use crate::errors::ExecutionError;

/// A single eventual payload.
pub type Mono = BoxFuture<'static, Result<Payload, ExecutionError>>;
/// A stream of payloads, terminated early by the first error.
pub type Flux = BoxStream<'static, Result<Payload, ExecutionError>>;

pub type RequestResponseHandler = Arc<dyn Fn(Context, Payload) -> Mono + Send + Sync>;
pub type FireAndForgetHandler = Arc<dyn Fn(Context, Payload) + Send + Sync>;
pub type RequestStreamHandler = Arc<dyn Fn(Context, Payload) -> Flux + Send + Sync>;
pub type RequestChannelHandler = Arc<dyn Fn(Context, Payload, Flux) -> Flux + Send + Sync>;

/// The four reactive interaction shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationType {
    RequestResponse,
    FireAndForget,
    RequestStream,
    RequestChannel,
}

impl OperationType {
    pub const ALL: [OperationType; 4] = [
        OperationType::RequestResponse,
        OperationType::FireAndForget,
        OperationType::RequestStream,
        OperationType::RequestChannel,
    ];
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationType::RequestResponse => "request-response",
            OperationType::FireAndForget => "fire-and-forget",
            OperationType::RequestStream => "request-stream",
            OperationType::RequestChannel => "request-channel",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Import,
    Export,
}

/// An operation an instance exports or imports, addressed by `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub index: u32,
    pub kind: OperationType,
    pub direction: Direction,
    pub namespace: String,
    pub operation: String,
}

/// Every operation an instance exposes or needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTable(Vec<Operation>);

impl OperationTable {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self(operations)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter()
    }

    pub fn exports(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(|op| op.direction == Direction::Export)
    }

    pub fn imports(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(|op| op.direction == Direction::Import)
    }

    /// Finds an operation by direction, shape and address.
    pub fn find(
        &self,
        direction: Direction,
        kind: OperationType,
        namespace: &str,
        operation: &str,
    ) -> Option<&Operation> {
        self.0.iter().find(|op| {
            op.direction == direction
                && op.kind == kind
                && op.namespace == namespace
                && op.operation == operation
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Operation> for OperationTable {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Handlers installed for imported operations, keyed by import index.
#[derive(Default)]
pub struct HandlerTable {
    request_response: RwLock<HashMap<u32, RequestResponseHandler>>,
    fire_and_forget: RwLock<HashMap<u32, FireAndForgetHandler>>,
    request_stream: RwLock<HashMap<u32, RequestStreamHandler>>,
    request_channel: RwLock<HashMap<u32, RequestChannelHandler>>,
}

impl HandlerTable {
    pub fn set_request_response(&self, index: u32, handler: RequestResponseHandler) {
        self.request_response.write().insert(index, handler);
    }

    pub fn set_fire_and_forget(&self, index: u32, handler: FireAndForgetHandler) {
        self.fire_and_forget.write().insert(index, handler);
    }

    pub fn set_request_stream(&self, index: u32, handler: RequestStreamHandler) {
        self.request_stream.write().insert(index, handler);
    }

    pub fn set_request_channel(&self, index: u32, handler: RequestChannelHandler) {
        self.request_channel.write().insert(index, handler);
    }

    pub fn request_response(&self, index: u32) -> Option<RequestResponseHandler> {
        self.request_response.read().get(&index).cloned()
    }

    pub fn fire_and_forget(&self, index: u32) -> Option<FireAndForgetHandler> {
        self.fire_and_forget.read().get(&index).cloned()
    }

    pub fn request_stream(&self, index: u32) -> Option<RequestStreamHandler> {
        self.request_stream.read().get(&index).cloned()
    }

    pub fn request_channel(&self, index: u32) -> Option<RequestChannelHandler> {
        self.request_channel.read().get(&index).cloned()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("request_response", &self.request_response.read().len())
            .field("fire_and_forget", &self.fire_and_forget.read().len())
            .field("request_stream", &self.request_stream.read().len())
            .field("request_channel", &self.request_channel.read().len())
            .finish()
    }
}
