// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compute instances: payloads, operation tables, and the [`Invoker`] that
//! exposes a processor's services to the mesh.

mod invoker;
pub mod operations;
pub mod payload;

pub use invoker::{ImportClient, Invoker};
pub use operations::{Direction, Flux, Mono, Operation, OperationTable, OperationType};
pub use payload::Payload;
