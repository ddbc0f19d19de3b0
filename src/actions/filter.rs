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

#[derive(Debug, Deserialize)]
pub struct FilterConfig {
    pub condition: Expr,
}

/// Stops the pipeline when `condition` is false.
#[derive(Debug)]
pub struct Filter {
    config: FilterConfig,
}

pub(crate) fn load(with: Option<&Value>, _: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config = decode_with("filter", with)?;
    Ok(Arc::new(Filter { config }))
}

#[async_trait]
impl Action for Filter {
    async fn run(&self, _ctx: &Context, data: &Data) -> StepOutcome {
        match data.eval_bool(&self.config.condition) {
            Ok(true) => StepOutcome::Continue(Value::Null),
            Ok(false) => StepOutcome::Stop(Value::Null),
            // re-running will not change the type
            Err(e) => StepOutcome::Fail(ExecutionError::permanent(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_filter_outcomes() {
        struct TestCase {
            name: &'static str,
            condition: &'static str,
            expected_stop: Option<bool>,
        }

        let test_cases = vec![
            TestCase { name: "true continues", condition: "input.paid", expected_stop: Some(false) },
            TestCase { name: "false stops", condition: "!input.paid", expected_stop: Some(true) },
            TestCase { name: "non-bool fails", condition: "input.total", expected_stop: None },
        ];

        let data = Data::with_input(json!({"paid": true, "total": 12}));
        for test_case in test_cases {
            let action = Filter {
                config: decode_with("filter", Some(&json!({"condition": test_case.condition}))).unwrap(),
            };
            let outcome = action.run(&Context::new(), &data).await;
            match test_case.expected_stop {
                Some(true) => assert_eq!(outcome, StepOutcome::Stop(Value::Null), "{}", test_case.name),
                Some(false) => assert_eq!(outcome, StepOutcome::Continue(Value::Null), "{}", test_case.name),
                None => assert!(
                    matches!(&outcome, StepOutcome::Fail(e) if e.is_permanent()),
                    "{}",
                    test_case.name
                ),
            }
        }
    }
}
