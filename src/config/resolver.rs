// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigError;

/// Named collaborators handed to action loaders.
///
/// Loaders look dependencies up by name and type, e.g. the codec table under
/// `codec:lookup`. A lookup fails if the name is missing or registered with a
/// different type.
#[derive(Clone, Default)]
pub struct Resolver {
    dependencies: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dependency` under `name`, replacing any previous entry.
    pub fn register<T: Any + Send + Sync>(&mut self, name: impl Into<String>, dependency: Arc<T>) {
        self.dependencies.insert(name.into(), dependency);
    }

    /// Builder-style [`Resolver::register`].
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, dependency: Arc<T>) -> Self {
        self.register(name, dependency);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.dependencies
            .get(name)
            .and_then(|dependency| Arc::clone(dependency).downcast::<T>().ok())
    }

    pub fn resolve<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnresolvedDependency(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.dependencies.keys().collect();
        names.sort();
        f.debug_struct("Resolver").field("dependencies", &names).finish()
    }
}
