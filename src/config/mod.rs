// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod resolver;

#[cfg(test)]
mod integration_tests;
pub mod consts;
pub mod duration;

pub use duration::parse_duration;
pub use loader::{
    load_config, Config, FunctionPipelines, PipelineConfig, ResiliencyConfig, Services, StepConfig,
};
pub use resolver::Resolver;
