// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::engine::{decode_with, Context, Data, LoadContext};
use crate::errors::{ConfigError, ExecutionError};
use crate::expr::Expr;
use crate::traits::{Action, StepOutcome};

/// Exactly one of `value` or `data` must be set. `data` is for building
/// records and must evaluate to an object.
///
/// # Example
/// ```yaml
/// uses: assign
/// with:
///   value: "'Hello, ' + input.name"
///   to: greeting
/// ```
/// ```yaml
/// uses: assign
/// with:
///   data: "{user: input.name, seen: true}"
///   to: profile
/// ```
#[derive(Debug, Deserialize)]
pub struct AssignConfig {
    #[serde(default)]
    pub value: Option<Expr>,
    #[serde(default)]
    pub data: Option<Expr>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug)]
enum Source {
    Value(Expr),
    Data(Expr),
}

/// Evaluates its source, optionally storing the result under `to`.
#[derive(Debug)]
pub struct Assign {
    source: Source,
    to: Option<String>,
}

impl TryFrom<AssignConfig> for Assign {
    type Error = ConfigError;

    fn try_from(config: AssignConfig) -> Result<Self, Self::Error> {
        let source = match (config.value, config.data) {
            (Some(value), None) => Source::Value(value),
            (None, Some(data)) => Source::Data(data),
            (None, None) => return Err(ConfigError::invalid_action("assign", "one of `value` or `data` is required")),
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid_action("assign", "`value` and `data` are mutually exclusive"))
            }
        };
        Ok(Self { source, to: config.to })
    }
}

pub(crate) fn load(with: Option<&Value>, _: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config: AssignConfig = decode_with("assign", with)?;
    Ok(Arc::new(Assign::try_from(config)?))
}

impl Assign {
    fn evaluate(&self, data: &Data) -> Result<Value, ExecutionError> {
        match &self.source {
            Source::Value(expr) => Ok(data.eval(expr)?),
            Source::Data(expr) => match data.eval(expr)? {
                record @ Value::Object(_) => Ok(record),
                other => Err(ExecutionError::permanent(ExecutionError::action(format!(
                    "assign data `{}` produced {}, expected an object",
                    expr.source(),
                    other
                )))),
            },
        }
    }
}

#[async_trait]
impl Action for Assign {
    async fn run(&self, _ctx: &Context, data: &Data) -> StepOutcome {
        let value = match self.evaluate(data) {
            Ok(value) => value,
            Err(e) => return StepOutcome::Fail(e),
        };
        if let Some(to) = &self.to {
            data.insert(to.clone(), value.clone());
        }
        StepOutcome::Continue(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assign(with: Value) -> Result<Assign, ConfigError> {
        Assign::try_from(decode_with::<AssignConfig>("assign", Some(&with))?)
    }

    #[tokio::test]
    async fn test_assign_writes_target() {
        let action = assign(json!({"value": "input.n + 1", "to": "next"})).unwrap();
        let data = Data::with_input(json!({"n": 41}));

        let outcome = action.run(&Context::new(), &data).await;

        assert_eq!(outcome, StepOutcome::Continue(json!(42)));
        assert_eq!(data.get("next"), Some(json!(42)));
    }

    #[tokio::test]
    async fn test_literal_value_without_target() {
        let action = assign(json!({"value": [1, 2]})).unwrap();
        let data = Data::new();

        assert_eq!(action.run(&Context::new(), &data).await, StepOutcome::Continue(json!([1, 2])));
        assert!(data.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_data_builds_a_record() {
        let action = assign(json!({"data": "{user: input.name, id: input.id + 1}", "to": "profile"})).unwrap();
        let data = Data::with_input(json!({"name": "Ada", "id": 1}));

        let outcome = action.run(&Context::new(), &data).await;

        assert_eq!(outcome, StepOutcome::Continue(json!({"user": "Ada", "id": 2})));
        assert_eq!(data.get("profile"), Some(json!({"user": "Ada", "id": 2})));
    }

    #[tokio::test]
    async fn test_data_that_is_not_an_object_fails_permanently() {
        let action = assign(json!({"data": "input.name", "to": "profile"})).unwrap();
        let data = Data::with_input(json!({"name": "Ada"}));

        match action.run(&Context::new(), &data).await {
            StepOutcome::Fail(error) => assert!(error.is_permanent()),
            other => panic!("expected a failure, got {:?}", other),
        }
        assert_eq!(data.get("profile"), None);
    }

    #[test]
    fn test_exactly_one_source_is_required() {
        for with in [json!({}), json!({"to": "x"}), json!({"value": 1, "data": "{a: 1}"})] {
            let result = assign(with.clone());
            assert!(
                matches!(result, Err(ConfigError::InvalidActionConfig { .. })),
                "accepted {}",
                with
            );
        }
    }
}
