// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tracing::Instrument;

use crate::config::consts::PROCESSOR_DEPENDENCY;
use crate::config::{Config, FunctionPipelines, PipelineConfig, Resolver, Services};
use crate::engine::data::INPUT;
use crate::engine::registry::{LoadContext, Policies, Registry};
use crate::engine::{Context, Data, Runnable};
use crate::errors::{ConfigError, ExecutionError};
use crate::observability::messages::pipeline::{PipelineStarted, ProcessorLoaded};
use crate::observability::messages::StructuredLog;
use crate::resiliency::CircuitBreaker;

/// Runnables keyed by `"namespace.service"`, then by operation.
pub type Namespaces = BTreeMap<String, BTreeMap<String, Runnable>>;

#[derive(Default)]
struct Loaded {
    services: Namespaces,
    providers: Namespaces,
    events: HashMap<String, Runnable>,
    pipelines: HashMap<String, Runnable>,
}

/// Filled in once loading finishes. Handles given to actions during loading
/// observe an empty catalog until then.
#[derive(Default)]
struct Catalog {
    loaded: OnceLock<Loaded>,
}

/// Compiles a [`Config`] into runnables and exposes the invocation surfaces.
///
/// Every pipeline is compiled eagerly in [`Processor::new`], so unregistered
/// actions, undefined policies and malformed step configuration are reported
/// before anything runs.
#[derive(Clone)]
pub struct Processor {
    catalog: Arc<Catalog>,
    registry: Registry,
    resolver: Resolver,
    policies: Arc<Policies>,
}

impl Processor {
    /// Loads every service, provider, event and named pipeline in `config`.
    ///
    /// A [`ProcessorHandle`] is registered in `resolver` under
    /// `system:processor` before loading, so actions such as
    /// `call_pipeline` can call back into this processor.
    pub fn new(config: &Config, registry: Registry, mut resolver: Resolver) -> Result<Self, ConfigError> {
        let catalog = Arc::new(Catalog::default());
        resolver.register(
            PROCESSOR_DEPENDENCY,
            Arc::new(ProcessorHandle {
                catalog: Arc::downgrade(&catalog),
            }),
        );
        let policies = Arc::new(Policies::from_config(&config.resiliency)?);

        let loaded = {
            let load = LoadContext::new(&registry, &resolver, &policies);
            Loaded {
                services: load_services(&load, &config.services)?,
                providers: load_services(&load, &config.providers)?,
                events: load_functions(&load, &config.events)?,
                pipelines: load_functions(&load, &config.pipelines)?,
            }
        };

        ProcessorLoaded {
            services: loaded.services.values().map(BTreeMap::len).sum(),
            providers: loaded.providers.values().map(BTreeMap::len).sum(),
            events: loaded.events.len(),
            pipelines: loaded.pipelines.len(),
        }
        .log();
        catalog.loaded.get_or_init(|| loaded);

        Ok(Self {
            catalog,
            registry,
            resolver,
            policies,
        })
    }

    /// Compiles a standalone pipeline with this processor's actions and
    /// policies. Each call yields an independent runnable.
    pub fn load_pipeline(&self, name: &str, config: &PipelineConfig) -> Result<Runnable, ConfigError> {
        LoadContext::new(&self.registry, &self.resolver, &self.policies).load_pipeline(name, config)
    }

    /// A weak handle for collaborators that must not keep the processor alive.
    pub fn handle(&self) -> ProcessorHandle {
        ProcessorHandle {
            catalog: Arc::downgrade(&self.catalog),
        }
    }

    /// Runs a service function.
    ///
    /// Returns `Ok(None)` when no such function is configured. When the
    /// pipeline's result is `null`, the invocation's `input` is returned.
    pub async fn service(
        &self,
        ctx: &Context,
        namespace: &str,
        service: &str,
        function: &str,
        data: &Data,
    ) -> Result<Option<Value>, ExecutionError> {
        self.catalog.service(ctx, namespace, service, function, data).await
    }

    /// Runs a provider function. A missing function is an error.
    pub async fn provider(
        &self,
        ctx: &Context,
        namespace: &str,
        service: &str,
        function: &str,
        data: &Data,
    ) -> Result<Value, ExecutionError> {
        self.catalog.provider(ctx, namespace, service, function, data).await
    }

    /// Runs an event handler. A missing handler is an error.
    pub async fn event(&self, ctx: &Context, function: &str, data: &Data) -> Result<Value, ExecutionError> {
        self.catalog.event(ctx, function, data).await
    }

    /// Runs a named pipeline. A missing pipeline is an error.
    pub async fn pipeline(&self, ctx: &Context, name: &str, data: &Data) -> Result<Value, ExecutionError> {
        self.catalog.pipeline(ctx, name, data).await
    }

    /// The service runnables, for exposing through an invoker.
    pub fn namespaces(&self) -> Namespaces {
        self.catalog
            .loaded
            .get()
            .map(|loaded| loaded.services.clone())
            .unwrap_or_default()
    }

    pub fn circuit_breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.policies.circuit_breaker(name).cloned()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaded = self.catalog.loaded.get();
        f.debug_struct("Processor")
            .field("services", &loaded.map(|l| l.services.keys().collect::<Vec<_>>()))
            .field("providers", &loaded.map(|l| l.providers.keys().collect::<Vec<_>>()))
            .field("events", &loaded.map(|l| l.events.len()))
            .field("pipelines", &loaded.map(|l| l.pipelines.len()))
            .finish()
    }
}

/// A non-owning handle to a [`Processor`], resolved by actions under
/// `system:processor`.
#[derive(Clone)]
pub struct ProcessorHandle {
    catalog: Weak<Catalog>,
}

impl ProcessorHandle {
    fn catalog(&self) -> Result<Arc<Catalog>, ExecutionError> {
        self.catalog.upgrade().ok_or(ExecutionError::ProcessorGone)
    }

    pub async fn provider(
        &self,
        ctx: &Context,
        namespace: &str,
        service: &str,
        function: &str,
        data: &Data,
    ) -> Result<Value, ExecutionError> {
        self.catalog()?
            .provider(ctx, namespace, service, function, data)
            .await
    }

    pub async fn pipeline(&self, ctx: &Context, name: &str, data: &Data) -> Result<Value, ExecutionError> {
        self.catalog()?.pipeline(ctx, name, data).await
    }

    pub async fn event(&self, ctx: &Context, function: &str, data: &Data) -> Result<Value, ExecutionError> {
        self.catalog()?.event(ctx, function, data).await
    }
}

impl Catalog {
    fn loaded(&self) -> Result<&Loaded, ExecutionError> {
        self.loaded.get().ok_or(ExecutionError::ProcessorGone)
    }

    async fn service(
        &self,
        ctx: &Context,
        namespace: &str,
        service: &str,
        function: &str,
        data: &Data,
    ) -> Result<Option<Value>, ExecutionError> {
        let key = service_key(namespace, service);
        let Some(runnable) = lookup(&self.loaded()?.services, &key, function) else {
            return Ok(None);
        };

        let ctx = ctx.with_target(key.as_str(), function);
        let result = execute("service", &runnable, &ctx, data).await?;
        if result.is_null() {
            return Ok(Some(data.get(INPUT).unwrap_or(Value::Null)));
        }
        Ok(Some(result))
    }

    async fn provider(
        &self,
        ctx: &Context,
        namespace: &str,
        service: &str,
        function: &str,
        data: &Data,
    ) -> Result<Value, ExecutionError> {
        let key = service_key(namespace, service);
        let runnable = lookup(&self.loaded()?.providers, &key, function)
            .ok_or_else(|| ExecutionError::UnknownFunction(format!("{}/{}", key, function)))?;

        let ctx = ctx.with_target(key.as_str(), function);
        execute("provider", &runnable, &ctx, data).await
    }

    async fn event(&self, ctx: &Context, function: &str, data: &Data) -> Result<Value, ExecutionError> {
        let runnable = self
            .loaded()?
            .events
            .get(function)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownFunction(function.to_string()))?;
        execute("event", &runnable, ctx, data).await
    }

    async fn pipeline(&self, ctx: &Context, name: &str, data: &Data) -> Result<Value, ExecutionError> {
        let runnable = self
            .loaded()?
            .pipelines
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownFunction(name.to_string()))?;
        execute("pipeline", &runnable, ctx, data).await
    }
}

/// `namespace` may already be the full `"namespace.service"` key, in which
/// case `service` is empty.
fn service_key(namespace: &str, service: &str) -> String {
    if service.is_empty() {
        namespace.to_string()
    } else {
        format!("{}.{}", namespace, service)
    }
}

fn lookup(namespaces: &Namespaces, key: &str, function: &str) -> Option<Runnable> {
    namespaces.get(key)?.get(function).cloned()
}

async fn execute(kind: &str, runnable: &Runnable, ctx: &Context, data: &Data) -> Result<Value, ExecutionError> {
    let started = PipelineStarted {
        kind,
        name: runnable.name(),
        step_count: runnable.len(),
    };
    started.log();
    let span = started.span("invoke");
    runnable.run(ctx, data).instrument(span).await
}

fn load_services(load: &LoadContext<'_>, services: &Services) -> Result<Namespaces, ConfigError> {
    services
        .iter()
        .map(|(service, functions)| {
            let runnables = functions
                .iter()
                .map(|(function, pipeline)| {
                    let name = format!("{}/{}", service, function);
                    Ok((function.clone(), load.load_pipeline(&name, pipeline)?))
                })
                .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;
            Ok((service.clone(), runnables))
        })
        .collect()
}

fn load_functions(
    load: &LoadContext<'_>,
    functions: &FunctionPipelines,
) -> Result<HashMap<String, Runnable>, ConfigError> {
    functions
        .iter()
        .map(|(function, pipeline)| Ok((function.clone(), load.load_pipeline(function, pipeline)?)))
        .collect()
}
