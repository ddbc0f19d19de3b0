// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::expr::{Expr, ExprError};

/// The key the caller's input is stored under.
pub const INPUT: &str = "input";

/// Mutable, string-keyed state threaded through one pipeline invocation.
///
/// Every step of an invocation reads and writes the same `Data`, so later
/// steps observe earlier steps' writes. A fresh `Data` is created per
/// top-level call and is never shared between calls, which is why the type
/// is not `Clone`.
#[derive(Debug, Default)]
pub struct Data {
    values: Mutex<Map<String, Value>>,
}

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Data` holding `input` under [`INPUT`].
    pub fn with_input(input: Value) -> Self {
        let mut values = Map::new();
        values.insert(INPUT.to_string(), input);
        Self::from(values)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.lock().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.lock().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    /// Evaluates `expr` with the current values as its scope.
    pub fn eval(&self, expr: &Expr) -> Result<Value, ExprError> {
        expr.eval(&self.values.lock())
    }

    /// Evaluates `expr` and requires a boolean result.
    pub fn eval_bool(&self, expr: &Expr) -> Result<bool, ExprError> {
        expr.eval_bool(&self.values.lock())
    }

    /// A copy of the current values.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.lock().clone()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.values.into_inner()
    }
}

impl From<Map<String, Value>> for Data {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}
