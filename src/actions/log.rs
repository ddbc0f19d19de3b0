// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::engine::{decode_with, Context, Data, LoadContext};
use crate::errors::ConfigError;
use crate::expr::{to_display, Expr};
use crate::traits::{Action, StepOutcome};

/// # Example
/// ```yaml
/// uses: log
/// with:
///   format: "order {} accepted for {}"
///   args: [input.id, input.customer]
/// ```
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub format: String,
    #[serde(default)]
    pub args: Vec<Expr>,
}

#[derive(Debug)]
pub struct Log {
    config: LogConfig,
}

pub(crate) fn load(with: Option<&Value>, _: &LoadContext<'_>) -> Result<Arc<dyn Action>, ConfigError> {
    let config = decode_with("log", with)?;
    Ok(Arc::new(Log { config }))
}

impl Log {
    fn render(&self, data: &Data) -> Result<String, crate::expr::ExprError> {
        let args = self
            .config
            .args
            .iter()
            .map(|arg| data.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format_placeholders(&self.config.format, &args))
    }
}

#[async_trait]
impl Action for Log {
    async fn run(&self, ctx: &Context, data: &Data) -> StepOutcome {
        match self.render(data) {
            Ok(message) => {
                let target = ctx.target().map(|t| format!("{}/{}", t.namespace, t.operation));
                tracing::info!(target_operation = target.as_deref(), "{}", message);
                StepOutcome::Continue(Value::Null)
            }
            Err(e) => StepOutcome::Fail(e.into()),
        }
    }
}

/// Replaces each `{}` with the next argument. Surplus placeholders are left
/// as they are; surplus arguments are ignored.
fn format_placeholders(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut rest = format;
    while let Some(at) = rest.find("{}") {
        out.push_str(&rest[..at]);
        match args.next() {
            Some(arg) => out.push_str(&to_display(arg)),
            None => out.push_str("{}"),
        }
        rest = &rest[at + 2..];
    }
    out.push_str(rest);
    out
}
