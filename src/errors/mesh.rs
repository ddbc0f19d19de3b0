// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::errors::ExecutionError;

/// Errors raised by mesh lifecycle operations.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// One or more linked instances failed to close.
    ///
    /// Every instance is closed regardless of earlier failures; this variant
    /// collects each `(instance, error)` pair in link order.
    Close(Vec<(String, ExecutionError)>),

    /// An instance was linked after [`crate::mesh::Mesh::close`].
    Closed,
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::Close(failures) => {
                write!(f, "failed to close {} instance(s): ", failures.len())?;
                for (i, (instance, error)) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", instance, error)?;
                }
                Ok(())
            }
            MeshError::Closed => write!(f, "mesh is closed"),
        }
    }
}

impl std::error::Error for MeshError {}
