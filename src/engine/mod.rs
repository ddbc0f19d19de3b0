// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod context;
pub mod data;
pub mod processor;
pub mod registry;
pub mod runnable;

pub use context::{Context, Target};
pub use data::{Data, INPUT};
pub use processor::{Namespaces, Processor, ProcessorHandle};
pub use registry::{decode_with, LoadContext, Loader, Policies, Registry};
pub use runnable::Runnable;
