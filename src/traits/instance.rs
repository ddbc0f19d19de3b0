// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::compute::operations::{
    FireAndForgetHandler, Flux, Mono, OperationTable, RequestChannelHandler,
    RequestResponseHandler, RequestStreamHandler,
};
use crate::compute::payload::Payload;
use crate::engine::Context;
use crate::errors::ExecutionError;

/// A compute instance the mesh can link: it exports operations addressed by
/// index and may import operations exported by other instances.
///
/// Inbound calls are routed by the operation index in the payload metadata.
/// Imports are satisfied by handlers the mesh installs with the `set_*`
/// methods, keyed by the import's index.
#[async_trait]
pub trait Instance: Send + Sync {
    /// A name for logs and close errors.
    fn name(&self) -> &str;

    fn operations(&self) -> &OperationTable;

    fn request_response(&self, ctx: Context, payload: Payload) -> Mono;

    fn fire_and_forget(&self, ctx: Context, payload: Payload);

    fn request_stream(&self, ctx: Context, payload: Payload) -> Flux;

    fn request_channel(&self, ctx: Context, payload: Payload, inbound: Flux) -> Flux;

    fn set_request_response_handler(&self, index: u32, handler: RequestResponseHandler);

    fn set_fire_and_forget_handler(&self, index: u32, handler: FireAndForgetHandler);

    fn set_request_stream_handler(&self, index: u32, handler: RequestStreamHandler);

    fn set_request_channel_handler(&self, index: u32, handler: RequestChannelHandler);

    async fn close(&self) -> Result<(), ExecutionError> {
        Ok(())
    }
}
