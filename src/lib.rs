// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod actions;       // core pipeline actions
pub mod codecs;        // payload codecs
pub mod compute;       // payloads, operation tables, invoker
pub mod config;        // config loading + resolver
pub mod engine;        // processor and runnables
pub mod errors;        // error handling
pub mod expr;          // expression language
pub mod mesh;          // import/export router
pub mod observability;
pub mod resiliency;    // timeout, retry, circuit breaker
pub mod traits;        // unified abstractions
