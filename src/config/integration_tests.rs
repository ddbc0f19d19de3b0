#[cfg(test)]
mod integration_tests {
    use serde_json::{json, Value};
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::codecs::Codecs;
    use crate::config::consts::CODEC_LOOKUP_DEPENDENCY;
    use crate::config::{load_config, Resolver};
    use crate::engine::{Context, Data, Processor, Registry};
    use crate::errors::ConfigError;
    use crate::resiliency::RetryConfig;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create config directory");
        }
        fs::write(&path, content).expect("Failed to write config");
        path
    }

    fn processor(path: &str) -> Processor {
        let config = load_config(path).expect("Failed to load config");
        let resolver = Resolver::new().with(CODEC_LOOKUP_DEPENDENCY, Arc::new(Codecs::standard()));
        Processor::new(&config, Registry::with_core_actions(), resolver).expect("Failed to compile config")
    }

    /// The sample configuration loads, merges its import and compiles
    #[test]
    fn test_greeter_sample_loading() {
        let config = load_config("configs/greeter.yaml").unwrap();

        assert_eq!(config.import, vec!["resiliency.yaml"]);
        assert_eq!(config.resiliency.timeouts["fast"], "250ms");
        assert_eq!(
            config.resiliency.retries["events"],
            RetryConfig::constant(Duration::from_millis(100), Some(3))
        );
        assert!(config.resiliency.circuit_breakers.contains_key("database"));
        assert_eq!(config.services["greeting.v1.Greeter"].len(), 2);
        assert_eq!(config.pipelines.len(), 2);
        assert!(config.events.contains_key("userSignedUp"));
    }

    #[tokio::test]
    async fn test_greeter_sample_runs() {
        let processor = processor("configs/greeter.yaml");

        let data = Data::with_input(json!({"name": "Ada"}));
        let result = processor
            .service(&Context::new(), "greeting.v1", "Greeter", "sayHello", &data)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"message": "Hello, Ada", "length": 10})));

        // the filter stops the pipeline and the service falls back to its input
        let data = Data::with_input(json!({"name": ""}));
        let result = processor
            .service(&Context::new(), "greeting.v1", "Greeter", "sayHello", &data)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"name": ""})));

        let data = Data::with_input(json!({"name": "Grace"}));
        let result = processor
            .service(&Context::new(), "greeting.v1", "Greeter", "farewell", &data)
            .await
            .unwrap();
        assert_eq!(result, Some(json!("Goodbye, Grace")));
    }

    #[tokio::test]
    async fn test_greeter_sample_event() {
        let processor = processor("configs/greeter.yaml");

        let data = Data::with_input(Value::String(r#"{"name": "Linus", "vip": true}"#.to_string()));
        let result = processor.event(&Context::new(), "userSignedUp", &data).await.unwrap();

        assert_eq!(result, json!({"event": "greeted", "who": "Linus"}));
        assert_eq!(data.get("journal"), Some(json!({"event": "greeted", "who": "Linus"})));
    }

    /// Imported files fill gaps; the importing file wins on conflicts
    #[test]
    fn test_imports_are_first_wins() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "shared/policies.yaml",
            r#"
resiliency:
  timeouts:
    fast: 1s
    slow: 10s
services:
  greeting.v1.Greeter:
    sayHello:
      steps: [{ name: imported, uses: log, with: { format: imported } }]
    sayGoodbye:
      steps: [{ name: imported, uses: log, with: { format: imported } }]
"#,
        );
        let main = write(
            &dir,
            "main.yaml",
            r#"
import: [shared/policies.yaml]
resiliency:
  timeouts:
    fast: 100ms
services:
  greeting.v1.Greeter:
    sayHello:
      steps: [{ name: local, uses: log, with: { format: local } }]
"#,
        );

        let config = load_config(&main).unwrap();
        assert_eq!(config.resiliency.timeouts["fast"], "100ms");
        assert_eq!(config.resiliency.timeouts["slow"], "10s");

        let greeter = &config.services["greeting.v1.Greeter"];
        assert_eq!(greeter["sayHello"].steps[0].name, "local");
        assert_eq!(greeter["sayGoodbye"].steps[0].name, "imported");
    }

    #[test]
    fn test_import_cycles_terminate() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yaml", "import: [b.yaml]\npipelines:\n  a: { call: b }\n");
        let b = write(&dir, "b.yaml", "import: [a.yaml]\npipelines:\n  b: { steps: [] }\n");

        let config = load_config(&b).unwrap();
        assert!(config.pipelines.contains_key("a"));
        assert!(config.pipelines.contains_key("b"));
    }

    #[test]
    fn test_toml_configuration() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "orders.toml",
            r#"
[resiliency.retries.database]
policy = "constant"
duration = "250ms"
maxRetries = 2

[[services."orders.v1.Orders".create.steps]]
name = "validate"
uses = "filter"
with = { condition = "input.total > 0" }
retry = "database"
"#,
        );

        let config = load_config(&path).unwrap();
        let step = &config.services["orders.v1.Orders"]["create"].steps[0];
        assert_eq!(step.uses.as_deref(), Some("filter"));
        assert_eq!(step.with, Some(json!({"condition": "input.total > 0"})));
        assert_eq!(
            config.resiliency.retries["database"],
            RetryConfig::constant(Duration::from_millis(250), Some(2))
        );
    }

    #[test]
    fn test_load_failures() {
        let dir = TempDir::new().unwrap();
        let json = write(&dir, "config.json", "{}");
        let dangling = write(&dir, "dangling.yaml", "import: [missing.yaml]\n");

        assert!(matches!(load_config(&json), Err(ConfigError::UnsupportedFormat(ext)) if ext == "json"));
        assert!(matches!(load_config(&dangling), Err(ConfigError::Io(_))));
        assert!(matches!(load_config(dir.path().join("absent.yaml")), Err(ConfigError::Io(_))));
    }
}
