// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A small expression language evaluated against JSON values.
//!
//! Expressions show up in two places: circuit breaker `trip` predicates,
//! which are evaluated over the breaker's counters, and the `with` blocks of
//! the core actions (`assign`, `filter`, `route`, `log`), which are evaluated
//! over the pipeline's [`crate::engine::Data`].
//!
//! Expressions are parsed once, when configuration is loaded, and evaluated
//! many times.
//!
//! # Example
//! ```
//! use serde_json::{json, Map, Value};
//! use the_switchyard::expr::Expr;
//!
//! let expr = Expr::parse("consecutiveFailures > 2 && requests >= 3").unwrap();
//!
//! let mut scope = Map::new();
//! scope.insert("consecutiveFailures".to_string(), json!(3));
//! scope.insert("requests".to_string(), json!(3));
//!
//! assert_eq!(expr.eval(&scope).unwrap(), Value::Bool(true));
//! ```

mod eval;
mod lexer;
mod parser;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use parser::Node;

pub(crate) use eval::to_display;

/// Errors raised while parsing or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// A parsed expression.
#[derive(Clone, PartialEq)]
pub struct Expr {
    source: String,
    root: Node,
}

impl Expr {
    /// Parses `source` into an expression.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        Ok(Self {
            source: source.to_string(),
            root: parser::parse(source)?,
        })
    }

    /// An expression that always evaluates to `value`.
    pub fn literal(value: Value) -> Self {
        Self {
            source: value.to_string(),
            root: Node::Literal(value),
        }
    }

    /// The text this expression was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression. Unknown identifiers evaluate to `null`.
    pub fn eval(&self, scope: &Map<String, Value>) -> Result<Value, ExprError> {
        eval::eval(&self.root, scope)
    }

    /// Evaluates the expression and requires a boolean result.
    pub fn eval_bool(&self, scope: &Map<String, Value>) -> Result<bool, ExprError> {
        match self.eval(scope)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExprError::Type(format!(
                "expression '{}' did not evaluate to a boolean (got {})",
                self.source, other
            ))),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.source).finish()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Strings are parsed as expressions; any other scalar or structure becomes a
/// literal. This lets YAML like `value: 1` and `value: "input.count + 1"` both
/// deserialize into an `Expr`.
impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(source) => Expr::parse(&source).map_err(serde::de::Error::custom),
            other => Ok(Expr::literal(other)),
        }
    }
}
