use serde_json::{json, Value};
use std::env;
use std::sync::Arc;

use the_switchyard::codecs::{Codecs, JsonCodec};
use the_switchyard::compute::{Direction, ImportClient, Invoker, OperationType, Payload};
use the_switchyard::config::consts::{CODEC_LOOKUP_DEPENDENCY, INVOKER_DEPENDENCY};
use the_switchyard::config::{load_config, Config, Resolver};
use the_switchyard::engine::{Context, Processor, Registry, Target};
use the_switchyard::mesh::Mesh;
use the_switchyard::traits::Instance;

const FRONTEND: &str = r#"
services:
  web.v1.Frontend:
    welcome:
      steps:
        - name: ask greeter
          uses: invoke
          with:
            namespace: greeting.v1.Greeter
            operation: sayHello
            input: "{name: input.user}"
"#;

/// Builds an invoker over `config`, importing `imports` through its own client.
fn instance(name: &str, config: &Config, imports: Vec<Target>) -> Result<Arc<Invoker>, Box<dyn std::error::Error>> {
    let client = Arc::new(ImportClient::new(imports, Arc::new(JsonCodec)));
    let resolver = Resolver::new()
        .with(CODEC_LOOKUP_DEPENDENCY, Arc::new(Codecs::standard()))
        .with(INVOKER_DEPENDENCY, client.clone());
    let processor = Processor::new(config, Registry::with_core_actions(), resolver)?;
    Ok(Arc::new(Invoker::new(name, processor.namespaces(), client)))
}

/// Demo linking two instances through a mesh: a frontend whose `welcome`
/// pipeline imports the greeter's `sayHello` export.
/// Usage: cargo run --example mesh_demo [config_file] [user]
async fn run_mesh_demo(config_file: String, user: String) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Mesh Demo ===\n");

    println!("Loading greeter configuration from {}...", config_file);
    let greeter_config = load_config(&config_file)?;
    let frontend_config = Config::from_str_with_format(FRONTEND, "yaml")?;

    let greeter = instance("greeter", &greeter_config, Vec::new())?;
    let frontend = instance(
        "frontend",
        &frontend_config,
        vec![Target {
            namespace: "greeting.v1.Greeter".to_string(),
            operation: "sayHello".to_string(),
        }],
    )?;

    println!("\nGreeter exports:");
    for export in greeter.operations().exports() {
        println!("- [{}] {} {}/{}", export.index, export.kind, export.namespace, export.operation);
    }

    // link the importer first; its imports wait for the greeter
    let mesh = Mesh::new();
    mesh.link(frontend.clone())?;
    println!("\nPending imports after linking the frontend: {}", mesh.pending().len());
    mesh.link(greeter)?;
    println!("Pending imports after linking the greeter: {}", mesh.pending().len());

    println!("\n=== Calling through the frontend ===");
    let welcome = frontend
        .operations()
        .find(Direction::Export, OperationType::RequestResponse, "web.v1.Frontend", "welcome")
        .ok_or("frontend does not export welcome")?;
    let request = Payload::for_index(welcome.index, serde_json::to_vec(&json!({"user": user}))?);
    let response = frontend.request_response(Context::new(), request).await?;
    let result: Value = serde_json::from_slice(response.data())?;
    println!("frontend -> greeter: {}", result);

    println!("\n=== Calling the mesh directly ===");
    let request = Payload::for_index(0, serde_json::to_vec(&json!({"name": user}))?);
    match mesh.request_response(Context::new(), "greeting.v1.Greeter", "sayHello", request) {
        Some(call) => {
            let result: Value = serde_json::from_slice(call.await?.data())?;
            println!("greeting.v1.Greeter/sayHello: {}", result);
        }
        None => println!("❌ nothing exports greeting.v1.Greeter/sayHello"),
    }

    mesh.close().await?;
    println!("\n✅ Mesh closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let config_file = args.get(1).cloned().unwrap_or_else(|| "configs/greeter.yaml".to_string());
    let user = args.get(2).cloned().unwrap_or_else(|| "Ada".to_string());

    run_mesh_demo(config_file, user).await
}
