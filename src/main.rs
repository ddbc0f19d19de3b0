// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context as _, Result};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use the_switchyard::codecs::{Codecs, JsonCodec};
use the_switchyard::compute::ImportClient;
use the_switchyard::config::consts::{CODEC_LOOKUP_DEPENDENCY, INVOKER_DEPENDENCY};
use the_switchyard::config::{load_config, Resolver};
use the_switchyard::engine::{Context, Data, Processor, Registry};

/// What to run, parsed from `kind:address`.
#[derive(Debug, PartialEq)]
enum Invocation {
    Service {
        namespace: String,
        service: String,
        function: String,
    },
    Provider {
        namespace: String,
        service: String,
        function: String,
    },
    Event(String),
    Pipeline(String),
}

impl Invocation {
    fn parse(target: &str) -> Result<Self> {
        let (kind, address) = target
            .split_once(':')
            .ok_or_else(|| anyhow!("target '{}' must look like <kind>:<address>", target))?;

        match kind {
            "service" | "provider" => {
                let (qualified, function) = address
                    .split_once('/')
                    .ok_or_else(|| anyhow!("'{}' must look like <namespace.service>/<function>", address))?;
                let (namespace, service) = qualified
                    .rsplit_once('.')
                    .ok_or_else(|| anyhow!("'{}' must look like <namespace>.<service>", qualified))?;
                let (namespace, service, function) =
                    (namespace.to_string(), service.to_string(), function.to_string());
                Ok(if kind == "service" {
                    Invocation::Service {
                        namespace,
                        service,
                        function,
                    }
                } else {
                    Invocation::Provider {
                        namespace,
                        service,
                        function,
                    }
                })
            }
            "event" => Ok(Invocation::Event(address.to_string())),
            "pipeline" => Ok(Invocation::Pipeline(address.to_string())),
            other => bail!("unknown target kind '{}' (expected service, provider, event or pipeline)", other),
        }
    }

    async fn run(&self, processor: &Processor, ctx: &Context, data: &Data) -> Result<Value> {
        let result = match self {
            Invocation::Service {
                namespace,
                service,
                function,
            } => processor
                .service(ctx, namespace, service, function, data)
                .await?
                .ok_or_else(|| anyhow!("no service function {}.{}/{}", namespace, service, function))?,
            Invocation::Provider {
                namespace,
                service,
                function,
            } => processor.provider(ctx, namespace, service, function, data).await?,
            Invocation::Event(function) => processor.event(ctx, function, data).await?,
            Invocation::Pipeline(name) => processor.pipeline(ctx, name, data).await?,
        };
        Ok(result)
    }
}

async fn run(config_file: &str, target: &str, input: Option<&str>) -> Result<Value> {
    let invocation = Invocation::parse(target)?;
    let input: Value = match input {
        Some(text) => serde_json::from_str(text).context("input must be JSON")?,
        None => Value::Null,
    };

    let config = load_config(config_file).with_context(|| format!("failed to load {}", config_file))?;

    // no mesh here, so `invoke` steps load but have nothing to route to
    let resolver = Resolver::new()
        .with(CODEC_LOOKUP_DEPENDENCY, Arc::new(Codecs::standard()))
        .with(
            INVOKER_DEPENDENCY,
            Arc::new(ImportClient::new(Vec::new(), Arc::new(JsonCodec))),
        );
    let processor = Processor::new(&config, Registry::with_core_actions(), resolver)
        .with_context(|| format!("failed to compile {}", config_file))?;

    let ctx = Context::new();
    let cancel = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    invocation.run(&processor, &ctx, &Data::with_input(input)).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if !(3..=4).contains(&args.len()) {
        eprintln!("Usage: {} <config.yaml|config.toml> <target> [input-json]", args[0]);
        eprintln!("Targets: service:<namespace.service>/<function>");
        eprintln!("         provider:<namespace.service>/<function>");
        eprintln!("         event:<function>");
        eprintln!("         pipeline:<name>");
        eprintln!(
            "Example: {} configs/greeter.yaml service:greeting.v1.Greeter/sayHello '{{\"name\": \"Ada\"}}'",
            args[0]
        );
        std::process::exit(1);
    }

    let started = Instant::now();
    match run(&args[1], &args[2], args.get(3).map(String::as_str)).await {
        Ok(result) => {
            match serde_json::to_string_pretty(&result) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("❌ Failed to render result: {}", e);
                    std::process::exit(1);
                }
            }
            tracing::debug!(elapsed = ?started.elapsed(), "invocation finished");
        }
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        }
    }
}
