// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Load-time configuration errors.
//!
//! Everything in here is raised while a configuration is read or while
//! pipelines are compiled into runnables. None of these errors can occur once
//! a [`crate::engine::Processor`] has been constructed.

use thiserror::Error;

use crate::expr::ExprError;

/// Errors raised while loading configuration or compiling pipelines.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A step `uses` an action name with no loader in the registry.
    #[error("unregistered action '{0}'")]
    UnregisteredAction(String),

    /// A step references a retry policy missing from `resiliency.retries`.
    #[error("retry policy '{0}' is not defined")]
    UndefinedRetry(String),

    /// A step references a breaker missing from `resiliency.circuitBreakers`.
    #[error("circuit breaker policy '{0}' is not defined")]
    UndefinedCircuitBreaker(String),

    /// A duration string could not be parsed.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// An action loader rejected its `with` block.
    #[error("invalid configuration for action '{action}': {reason}")]
    InvalidActionConfig { action: String, reason: String },

    /// An expression in the configuration failed to parse.
    #[error("expression error: {0}")]
    Expression(#[from] ExprError),

    /// A named collaborator was missing from the resolver or had the wrong type.
    #[error("could not resolve dependency '{0}'")]
    UnresolvedDependency(String),

    /// The configuration file extension is not a supported format.
    #[error("unsupported configuration format: '{0}'")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidActionConfig`].
    pub fn invalid_action(action: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidActionConfig {
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }
}
