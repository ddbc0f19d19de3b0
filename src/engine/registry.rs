// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{parse_duration, PipelineConfig, ResiliencyConfig, Resolver, StepConfig};
use crate::engine::runnable::{Runnable, Step};
use crate::errors::ConfigError;
use crate::resiliency::{CircuitBreaker, ResiliencyPolicy, RetryConfig};
use crate::traits::Action;

/// Builds an action from its `with` block.
pub type Loader =
    Arc<dyn Fn(Option<&Value>, &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> + Send + Sync>;

/// Action loaders by the name steps refer to them with in `uses`.
#[derive(Clone, Default)]
pub struct Registry {
    loaders: HashMap<String, Loader>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the core control-flow actions.
    pub fn with_core_actions() -> Self {
        let mut registry = Self::new();
        crate::actions::register_core(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, loader: F)
    where
        F: Fn(Option<&Value>, &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.loaders.insert(name.into(), Arc::new(loader));
    }

    pub fn get(&self, name: &str) -> Option<&Loader> {
        self.loaders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.loaders.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("actions", &names).finish()
    }
}

/// Named resiliency policies, built once and shared by every step.
#[derive(Debug, Default)]
pub struct Policies {
    timeouts: HashMap<String, Duration>,
    retries: HashMap<String, Arc<RetryConfig>>,
    circuit_breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl Policies {
    pub fn from_config(config: &ResiliencyConfig) -> Result<Self, ConfigError> {
        let timeouts = config
            .timeouts
            .iter()
            .map(|(name, value)| Ok((name.clone(), parse_duration(value)?)))
            .collect::<Result<_, ConfigError>>()?;
        let retries = config
            .retries
            .iter()
            .map(|(name, retry)| (name.clone(), Arc::new(retry.clone())))
            .collect();
        let circuit_breakers = config
            .circuit_breakers
            .iter()
            .map(|(name, breaker)| {
                (name.clone(), Arc::new(CircuitBreaker::new(name.clone(), breaker.clone())))
            })
            .collect();

        Ok(Self {
            timeouts,
            retries,
            circuit_breakers,
        })
    }

    pub fn circuit_breaker(&self, name: &str) -> Option<&Arc<CircuitBreaker>> {
        self.circuit_breakers.get(name)
    }

    /// A named timeout, or the value parsed as a duration.
    fn timeout(&self, value: &str) -> Result<Duration, ConfigError> {
        match self.timeouts.get(value) {
            Some(timeout) => Ok(*timeout),
            None => parse_duration(value),
        }
    }
}

/// What an action loader can see while it builds its action.
///
/// Loaders that run sub-pipelines (such as `route`) compile them through
/// [`LoadContext::load_pipeline`], so nested steps resolve actions and
/// policies exactly like top-level ones.
pub struct LoadContext<'a> {
    registry: &'a Registry,
    resolver: &'a Resolver,
    policies: &'a Policies,
}

impl<'a> LoadContext<'a> {
    pub fn new(registry: &'a Registry, resolver: &'a Resolver, policies: &'a Policies) -> Self {
        Self {
            registry,
            resolver,
            policies,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        self.resolver
    }

    pub fn resolve<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ConfigError> {
        self.resolver.resolve(name)
    }

    /// Compiles `config` into a runnable.
    pub fn load_pipeline(&self, name: &str, config: &PipelineConfig) -> Result<Runnable, ConfigError> {
        let name = config.name.as_deref().unwrap_or(name);

        if let Some(target) = &config.call {
            let step = StepConfig {
                name: format!("call {}", target),
                call: Some(target.clone()),
                ..StepConfig::default()
            };
            return Ok(Runnable::new(name, vec![self.load_step(&step)?]));
        }

        let steps = config
            .steps
            .iter()
            .map(|step| self.load_step(step))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Runnable::new(name, steps))
    }

    fn load_step(&self, config: &StepConfig) -> Result<Step, ConfigError> {
        let call_with;
        let (uses, with) = match (&config.uses, &config.call) {
            (Some(uses), _) => (uses.as_str(), config.with.as_ref()),
            (None, Some(target)) => {
                call_with = serde_json::json!({ "name": target });
                ("call_pipeline", Some(&call_with))
            }
            (None, None) => {
                return Err(ConfigError::invalid_action(
                    &config.name,
                    "step needs either `uses` or `call`",
                ))
            }
        };

        let loader = self
            .registry
            .get(uses)
            .ok_or_else(|| ConfigError::UnregisteredAction(uses.to_string()))?;
        let action = loader(with, self)?;

        let mut policy = ResiliencyPolicy::new(config.name.clone());
        if let Some(timeout) = &config.timeout {
            policy = policy.with_timeout(self.policies.timeout(timeout)?);
        }
        if let Some(retry) = &config.retry {
            let retry = self
                .policies
                .retries
                .get(retry)
                .ok_or_else(|| ConfigError::UndefinedRetry(retry.clone()))?;
            policy = policy.with_retry(retry.clone());
        }
        if let Some(breaker) = &config.circuit_breaker {
            let breaker = self
                .policies
                .circuit_breakers
                .get(breaker)
                .ok_or_else(|| ConfigError::UndefinedCircuitBreaker(breaker.clone()))?;
            policy = policy.with_circuit_breaker(breaker.clone());
        }

        Ok(Step {
            name: config.name.clone(),
            action,
            returns: config.returns.clone(),
            policy,
        })
    }
}

/// Decodes an action's `with` block into its config type, reporting failures
/// against the action's name. A missing block decodes from `{}`.
pub fn decode_with<T: DeserializeOwned>(action: &str, with: Option<&Value>) -> Result<T, ConfigError> {
    let value = with
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|e| ConfigError::invalid_action(action, e))
}
