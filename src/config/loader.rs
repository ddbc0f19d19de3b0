// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::config::consts::{YAML_EXTENSIONS, TOML_EXTENSIONS};
use crate::errors::ConfigError;
use crate::resiliency::{BreakerConfig, RetryConfig};

/// Pipelines keyed by function name.
pub type FunctionPipelines = BTreeMap<String, PipelineConfig>;

/// Function pipelines keyed by `"namespace.service"`.
pub type Services = BTreeMap<String, FunctionPipelines>;

/// Main configuration structure for the switchyard.
///
/// This struct represents a complete bus configuration: the named resiliency
/// policies and every pipeline, grouped by how it is invoked. It is
/// typically loaded from a YAML or TOML file with [`load_config`].
///
/// # Fields
/// * `import` - Further configuration files to merge in, relative to this one
/// * `resiliency` - Named timeouts, retry policies and circuit breakers
/// * `services` - Pipelines invoked through `Processor::service`
/// * `providers` - Pipelines invoked through `Processor::provider`
/// * `events` - Pipelines invoked through `Processor::event`
/// * `pipelines` - Named pipelines reachable from `call_pipeline` and `call:`
///
/// # Example
/// ```yaml
/// resiliency:
///   retries:
///     events:
///       policy: constant
///       duration: 100ms
///       maxRetries: 3
/// services:
///   greeting.v1.Greeter:
///     sayHello:
///       steps:
///         - name: build greeting
///           uses: assign
///           with:
///             value: "'Hello, ' + input.name"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub import: Vec<String>,
    pub resiliency: ResiliencyConfig,
    pub services: Services,
    pub providers: Services,
    pub events: FunctionPipelines,
    pub pipelines: FunctionPipelines,
}

/// Named resiliency policies that steps refer to.
///
/// # Fields
/// * `timeouts` - Durations a step's `timeout` may name instead of spelling out
/// * `retries` - Constant or exponential backoff policies
/// * `circuit_breakers` - Breakers shared by every step that names them
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResiliencyConfig {
    pub timeouts: HashMap<String, String>,
    pub retries: HashMap<String, RetryConfig>,
    pub circuit_breakers: HashMap<String, BreakerConfig>,
}

/// An ordered list of steps, or a `call` to another named pipeline.
///
/// # Example
/// ```yaml
/// name: create order
/// steps:
///   - name: validate
///     call: validate-order
///   - name: store
///     uses: call_provider
///     with:
///       namespace: orders.v1.Repository
///       operation: insert
///     retry: database
///     circuitBreaker: database
///     returns: order
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: Option<String>,
    pub call: Option<String>,
    pub steps: Vec<StepConfig>,
}

/// One step of a pipeline.
///
/// # Fields
/// * `name` - Human-readable step name, used in logs and retry messages
/// * `uses` - The registered action to run
/// * `call` - Shorthand for `uses: call_pipeline` with `with: {name: <call>}`
/// * `with` - The action's configuration
/// * `returns` - Name the step's result is stored under in `Data`
/// * `timeout` - A name from `resiliency.timeouts` or a duration such as `250ms`
/// * `retry` - A name from `resiliency.retries`
/// * `circuit_breaker` - A name from `resiliency.circuitBreakers`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepConfig {
    pub name: String,
    pub uses: Option<String>,
    pub call: Option<String>,
    pub with: Option<Value>,
    pub returns: Option<String>,
    pub timeout: Option<String>,
    pub retry: Option<String>,
    pub circuit_breaker: Option<String>,
}

impl Config {
    /// Merges `others` into this configuration. Entries already present win;
    /// services and providers merge per function.
    pub fn combine(&mut self, others: impl IntoIterator<Item = Config>) {
        for other in others {
            for (name, timeout) in other.resiliency.timeouts {
                self.resiliency.timeouts.entry(name).or_insert(timeout);
            }
            for (name, retry) in other.resiliency.retries {
                self.resiliency.retries.entry(name).or_insert(retry);
            }
            for (name, breaker) in other.resiliency.circuit_breakers {
                self.resiliency.circuit_breakers.entry(name).or_insert(breaker);
            }

            merge_services(&mut self.services, other.services);
            merge_services(&mut self.providers, other.providers);
            merge_functions(&mut self.events, other.events);
            merge_functions(&mut self.pipelines, other.pipelines);
        }
    }

    /// Parses configuration text in the format named by `extension`.
    pub fn from_str_with_format(content: &str, extension: &str) -> Result<Self, ConfigError> {
        let extension = extension.to_ascii_lowercase();
        if YAML_EXTENSIONS.contains(&extension.as_str()) {
            Ok(serde_yaml::from_str(content)?)
        } else if TOML_EXTENSIONS.contains(&extension.as_str()) {
            Ok(toml::from_str(content)?)
        } else {
            Err(ConfigError::UnsupportedFormat(extension))
        }
    }
}

fn merge_services(into: &mut Services, from: Services) {
    for (service, functions) in from {
        merge_functions(into.entry(service).or_default(), functions);
    }
}

fn merge_functions(into: &mut FunctionPipelines, from: FunctionPipelines) {
    for (function, pipeline) in from {
        into.entry(function).or_insert(pipeline);
    }
}

/// Load a config from a YAML or TOML file, chosen by extension.
///
/// Files listed under `import` are loaded relative to the importing file and
/// merged in with [`Config::combine`], so the importing file wins on
/// conflicts.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let mut visited = Vec::new();
    load_with_imports(path.as_ref(), &mut visited)
}

fn load_with_imports(path: &Path, visited: &mut Vec<std::path::PathBuf>) -> Result<Config, ConfigError> {
    let canonical = fs::canonicalize(path)?;
    if visited.contains(&canonical) {
        // already merged through another import
        return Ok(Config::default());
    }
    visited.push(canonical);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let content = fs::read_to_string(path)?;
    let mut config = Config::from_str_with_format(&content, extension)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let imports = std::mem::take(&mut config.import);
    let mut imported = Vec::with_capacity(imports.len());
    for import in &imports {
        imported.push(load_with_imports(&base.join(import), visited)?);
    }
    config.combine(imported);
    config.import = imports;

    Ok(config)
}
