// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The core actions every registry starts with.
//!
//! | uses            | does                                                   |
//! |-----------------|--------------------------------------------------------|
//! | `assign`        | evaluates `value`, optionally stores it under `to`     |
//! | `filter`        | stops the pipeline when `condition` is false           |
//! | `log`           | logs `format` with `{}` replaced by `args`             |
//! | `route`         | runs the sub-pipelines whose `when` holds              |
//! | `call_pipeline` | runs a named pipeline                                  |
//! | `call_provider` | runs a provider function                               |
//! | `decode`        | decodes raw bytes in place with a named codec          |
//! | `invoke`        | calls an imported operation through the mesh           |
//!
//! `call_pipeline` and `call_provider` resolve `system:processor`, `decode`
//! resolves `codec:lookup` and `invoke` resolves `client:invoker`; loading
//! one of them without its dependency is a configuration error.

pub mod assign;
pub mod call_pipeline;
pub mod call_provider;
pub mod decode;
pub mod filter;
pub mod invoke;
pub mod log;
pub mod route;

use crate::engine::Registry;

/// Registers the core actions under their `uses` names.
pub fn register_core(registry: &mut Registry) {
    registry.register("assign", assign::load);
    registry.register("filter", filter::load);
    registry.register("log", log::load);
    registry.register("route", route::load);
    registry.register("call_pipeline", call_pipeline::load);
    registry.register("call_provider", call_provider::load);
    registry.register("decode", decode::load);
    registry.register("invoke", invoke::load);
}
