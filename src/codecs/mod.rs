// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Payload codecs and the name-keyed table actions look them up in.

mod json;
mod yaml;

pub use json::JsonCodec;
pub use yaml::YamlCodec;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::traits::Codec;

/// Codecs by name, registered in the resolver as `codec:lookup`.
#[derive(Clone, Default)]
pub struct Codecs {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl Codecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// `json` and `yaml`.
    pub fn standard() -> Self {
        let mut codecs = Self::new();
        codecs.register("json", Arc::new(JsonCodec));
        codecs.register("yaml", Arc::new(YamlCodec));
        codecs
    }

    pub fn register(&mut self, name: impl Into<String>, codec: Arc<dyn Codec>) {
        self.codecs.insert(name.into(), codec);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .codecs
            .iter()
            .map(|(name, codec)| (name.as_str(), codec.content_type()))
            .collect();
        names.sort();
        f.debug_map().entries(names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_codecs() {
        let codecs = Codecs::standard();
        assert_eq!(codecs.get("json").map(|c| c.content_type()), Some("application/json"));
        assert_eq!(codecs.get("yaml").map(|c| c.content_type()), Some("application/yaml"));
        assert!(codecs.get("msgpack").is_none());
    }
}
