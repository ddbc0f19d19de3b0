// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// File extensions loaded with `serde_yaml`.
pub const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];
/// File extensions loaded with `toml`.
pub const TOML_EXTENSIONS: &[&str] = &["toml"];

/// Resolver name of the weak handle back into the running processor.
pub const PROCESSOR_DEPENDENCY: &str = "system:processor";
/// Resolver name of the codec table.
pub const CODEC_LOOKUP_DEPENDENCY: &str = "codec:lookup";
/// Resolver name of the import client used by the `invoke` action.
pub const INVOKER_DEPENDENCY: &str = "client:invoker";

/// Payloads buffered per stream before the producer waits for the consumer.
pub const STREAM_BUFFER_SIZE: usize = 16;
