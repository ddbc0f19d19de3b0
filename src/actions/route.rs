// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{PipelineConfig, StepConfig};
use crate::engine::{decode_with, Context, Data, LoadContext, Runnable};
use crate::errors::{ConfigError, ExecutionError};
use crate::expr::Expr;
use crate::traits::{Action, StepOutcome};

/// Whether the first matching route runs, or every matching route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    #[default]
    Single,
    Multi,
}

/// # Example
/// ```yaml
/// uses: route
/// with:
///   selection: single
///   routes:
///     - name: express
///       when: input.priority == 'high'
///       then:
///         - name: mark express
///           uses: assign
///           with: { value: "'express'", to: lane }
///     - name: standard
///       when: "true"
///       then:
///         - name: mark standard
///           uses: assign
///           with: { value: "'standard'", to: lane }
/// ```
#[derive(Debug, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub selection: Selection,
    pub routes: Vec<RouteCondition>,
}

#[derive(Debug, Deserialize)]
pub struct RouteCondition {
    #[serde(default)]
    pub name: Option<String>,
    pub when: Expr,
    pub then: Vec<StepConfig>,
}

struct Branch {
    when: Expr,
    runnable: Runnable,
}

/// Runs the sub-pipelines whose `when` holds. A stop inside a branch ends
/// only that branch.
pub struct Route {
    selection: Selection,
    branches: Vec<Branch>,
}

pub(crate) fn load(with: Option<&Value>, load: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config: RouteConfig = decode_with("route", with)?;
    let branches = config
        .routes
        .into_iter()
        .enumerate()
        .map(|(i, route)| {
            let name = route.name.unwrap_or_else(|| format!("route {}", i + 1));
            let pipeline = PipelineConfig {
                steps: route.then,
                ..PipelineConfig::default()
            };
            Ok(Branch {
                when: route.when,
                runnable: load.load_pipeline(&name, &pipeline)?,
            })
        })
        .collect::<Result<_, ConfigError>>()?;

    Ok(Arc::new(Route {
        selection: config.selection,
        branches,
    }))
}

impl Route {
    async fn select(&self, ctx: &Context, data: &Data) -> Result<Value, ExecutionError> {
        for branch in &self.branches {
            let matched = data
                .eval_bool(&branch.when)
                .map_err(|e| ExecutionError::permanent(e.into()))?;
            if !matched {
                continue;
            }

            let output = branch.runnable.run(ctx, data).await?;
            if self.selection == Selection::Single {
                return Ok(output);
            }
        }
        Ok(Value::Null)
    }
}

#[async_trait]
impl Action for Route {
    async fn run(&self, ctx: &Context, data: &Data) -> StepOutcome {
        self.select(ctx, data).await.into()
    }
}
