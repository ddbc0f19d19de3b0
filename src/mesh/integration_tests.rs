use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::codecs::JsonCodec;
use crate::compute::operations::{
    FireAndForgetHandler, RequestChannelHandler, RequestResponseHandler, RequestStreamHandler,
};
use crate::compute::{Direction, Flux, ImportClient, Invoker, Mono, OperationTable, OperationType, Payload};
use crate::config::consts::INVOKER_DEPENDENCY;
use crate::config::{Config, Resolver};
use crate::engine::{Context, Data, Processor, Registry, Target, INPUT};
use crate::errors::{ExecutionError, MeshError};
use crate::mesh::Mesh;
use crate::traits::{Action, Instance, StepOutcome};

/// Integration tests for linking invokers through the mesh
#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const GREETER: &str = r#"
services:
  greeting.v1.Greeter:
    sayHello:
      steps:
        - name: greet
          uses: assign
          with: { value: "'GREETING, ' + input.name" }
    countdown:
      steps:
        - name: count
          uses: assign
          with: { value: "[3, 2, 1]" }
"#;

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

    const JOURNAL: &str = r#"
services:
  audit.v1.Journal:
    record:
      steps:
        - name: record
          uses: recording
"#;

    /// Hands every input it runs with back to the test.
    struct Recording {
        seen: mpsc::UnboundedSender<Value>,
    }

    #[async_trait]
    impl Action for Recording {
        async fn run(&self, _ctx: &Context, data: &Data) -> StepOutcome {
            let input = data.get(INPUT).unwrap_or(Value::Null);
            let _ = self.seen.send(input.clone());
            StepOutcome::Continue(input)
        }
    }

    fn invoker_with(name: &str, yaml: &str, imports: Vec<Target>, registry: Registry) -> Arc<Invoker> {
        let client = Arc::new(ImportClient::new(imports, Arc::new(JsonCodec)));
        let resolver = Resolver::new().with(INVOKER_DEPENDENCY, client.clone());
        let config = Config::from_str_with_format(yaml, "yaml").expect("Failed to parse config");
        let processor = Processor::new(&config, registry, resolver).expect("Failed to load processor");
        Arc::new(Invoker::new(name, processor.namespaces(), client))
    }

    fn invoker(name: &str, yaml: &str, imports: Vec<Target>) -> Arc<Invoker> {
        invoker_with(name, yaml, imports, Registry::with_core_actions())
    }

    /// An exporter whose `record` operation reports each input it receives.
    fn journal() -> (Arc<Invoker>, mpsc::UnboundedReceiver<Value>) {
        let (seen, received) = mpsc::unbounded_channel();
        let mut registry = Registry::with_core_actions();
        registry.register("recording", move |_, _| {
            Ok(Arc::new(Recording { seen: seen.clone() }) as Arc<dyn Action>)
        });
        (invoker_with("journal", JOURNAL, Vec::new(), registry), received)
    }

    fn target(namespace: &str, operation: &str) -> Target {
        Target {
            namespace: namespace.to_string(),
            operation: operation.to_string(),
        }
    }

    fn import_index(importer: &Invoker, kind: OperationType, namespace: &str, operation: &str) -> u32 {
        importer
            .client()
            .operations()
            .find(Direction::Import, kind, namespace, operation)
            .expect("import is declared")
            .index
    }

    async fn recorded(received: &mut mpsc::UnboundedReceiver<Value>) -> Option<Value> {
        tokio::time::timeout(Duration::from_secs(5), received.recv())
            .await
            .expect("exporter ran in time")
    }

    fn greeter(name: &str, greeting: &str) -> Arc<Invoker> {
        invoker(name, &GREETER.replace("GREETING", greeting), Vec::new())
    }

    fn frontend() -> Arc<Invoker> {
        invoker(
            "frontend",
            FRONTEND,
            vec![Target {
                namespace: "greeting.v1.Greeter".to_string(),
                operation: "sayHello".to_string(),
            }],
        )
    }

    fn request(input: Value) -> Payload {
        // the mesh rewrites the index, so any placeholder works
        Payload::for_index(u32::MAX, serde_json::to_vec(&input).expect("encode"))
    }

    async fn welcome(frontend: &Invoker, user: &str) -> Result<Value, ExecutionError> {
        let index = frontend
            .operations()
            .find(Direction::Export, OperationType::RequestResponse, "web.v1.Frontend", "welcome")
            .expect("welcome is exported")
            .index;
        let payload = Payload::for_index(index, serde_json::to_vec(&json!({"user": user})).expect("encode"));
        let response = frontend.request_response(Context::new(), payload).await?;
        Ok(serde_json::from_slice(response.data()).expect("decode"))
    }

    #[tokio::test]
    async fn test_dispatch_rewrites_index_and_forwards() {
        let mesh = Mesh::new();
        mesh.link(greeter("greeter", "Hello")).expect("link");

        let response = mesh
            .request_response(Context::new(), "greeting.v1.Greeter", "sayHello", request(json!({"name": "Ada"})))
            .expect("route exists")
            .await
            .expect("call succeeds");
        assert_eq!(response.data().as_ref(), br#""Hello, Ada""#);

        let items: Vec<_> = mesh
            .request_stream(Context::new(), "greeting.v1.Greeter", "countdown", request(json!({})))
            .expect("route exists")
            .map(|p| p.expect("item").into_data())
            .collect()
            .await;
        assert_eq!(items, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_unmatched_dispatch_is_a_silent_no_op() {
        let mesh = Mesh::new();
        assert!(mesh
            .request_response(Context::new(), "nobody.v1.Home", "call", request(json!({})))
            .is_none());
        assert!(!mesh.fire_and_forget(Context::new(), "nobody.v1.Home", "call", request(json!({}))));
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let mesh = Mesh::new();
        let frontend = frontend();
        mesh.link(greeter("greeter", "Hello")).expect("link");
        mesh.link(frontend.clone()).expect("link");

        assert!(mesh.pending().is_empty());
        assert_eq!(welcome(&frontend, "Ada").await, Ok(json!("Hello, Ada")));
    }

    #[tokio::test]
    async fn test_import_before_export_resolves_later() {
        let mesh = Mesh::new();
        let frontend = frontend();
        mesh.link(frontend.clone()).expect("link");

        // one pending import per interaction shape
        assert_eq!(mesh.pending().len(), 4);
        assert!(matches!(
            welcome(&frontend, "Ada").await,
            Err(ExecutionError::Unroutable { .. })
        ));

        mesh.link(greeter("greeter", "Hello")).expect("link");
        assert!(mesh.pending().is_empty());
        assert_eq!(welcome(&frontend, "Grace").await, Ok(json!("Hello, Grace")));
    }

    #[tokio::test]
    async fn test_re_export_retargets_linked_imports() {
        let mesh = Mesh::new();
        let frontend = frontend();
        mesh.link(greeter("greeter-v1", "Hello")).expect("link");
        mesh.link(frontend.clone()).expect("link");
        assert_eq!(welcome(&frontend, "Ada").await, Ok(json!("Hello, Ada")));

        mesh.link(greeter("greeter-v2", "Howdy")).expect("link");
        assert_eq!(welcome(&frontend, "Ada").await, Ok(json!("Howdy, Ada")));
    }

    #[tokio::test]
    async fn test_fire_and_forget_runs_the_exporter() {
        let mesh = Mesh::new();
        let (journal, mut received) = journal();
        mesh.link(journal).expect("link");

        assert!(mesh.fire_and_forget(Context::new(), "audit.v1.Journal", "record", request(json!({"id": 1}))));
        assert_eq!(recorded(&mut received).await, Some(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_imports_forward_every_interaction_shape() {
        let mesh = Mesh::new();
        let (journal, mut received) = journal();
        let importer = invoker(
            "importer",
            "{}\n",
            vec![
                target("greeting.v1.Greeter", "sayHello"),
                target("greeting.v1.Greeter", "countdown"),
                target("audit.v1.Journal", "record"),
            ],
        );
        mesh.link(importer.clone()).expect("link");
        mesh.link(greeter("greeter", "Hello")).expect("link");
        mesh.link(journal).expect("link");
        assert!(mesh.pending().is_empty());

        let handlers = importer.client().handlers();

        let record = handlers
            .fire_and_forget(import_index(&importer, OperationType::FireAndForget, "audit.v1.Journal", "record"))
            .expect("fire-and-forget import is bound");
        record(Context::new(), request(json!({"id": 7})));
        assert_eq!(recorded(&mut received).await, Some(json!({"id": 7})));

        let countdown = handlers
            .request_stream(import_index(&importer, OperationType::RequestStream, "greeting.v1.Greeter", "countdown"))
            .expect("stream import is bound");
        let items: Vec<_> = countdown(Context::new(), request(json!({})))
            .map(|p| p.expect("item").into_data())
            .collect()
            .await;
        assert_eq!(items, vec!["3", "2", "1"]);

        let greet = handlers
            .request_channel(import_index(&importer, OperationType::RequestChannel, "greeting.v1.Greeter", "sayHello"))
            .expect("channel import is bound");
        let inbound = futures::stream::iter(vec![
            Ok::<_, ExecutionError>(request(json!({"name": "Grace"}))),
            Ok(request(json!({"name": "Linus"}))),
        ])
        .boxed();
        let replies: Vec<_> = greet(Context::new(), request(json!({"name": "Ada"})), inbound)
            .map(|p| p.expect("reply").into_data())
            .collect()
            .await;
        assert_eq!(replies, vec![r#""Hello, Ada""#, r#""Hello, Grace""#, r#""Hello, Linus""#]);
    }

    #[tokio::test]
    async fn test_in_flight_call_finishes_on_the_old_destination() {
        let mesh = Mesh::new();
        mesh.link(greeter("greeter-v1", "Hello")).expect("link");

        let in_flight = mesh
            .request_response(Context::new(), "greeting.v1.Greeter", "sayHello", request(json!({"name": "Ada"})))
            .expect("route exists");
        mesh.link(greeter("greeter-v2", "Howdy")).expect("link");

        let response = in_flight.await.expect("call succeeds");
        assert_eq!(response.data().as_ref(), br#""Hello, Ada""#);

        let response = mesh
            .request_response(Context::new(), "greeting.v1.Greeter", "sayHello", request(json!({"name": "Ada"})))
            .expect("route exists")
            .await
            .expect("call succeeds");
        assert_eq!(response.data().as_ref(), br#""Howdy, Ada""#);
    }

    #[tokio::test]
    async fn test_link_after_close_is_rejected() {
        let mesh = Mesh::new();
        mesh.link(greeter("greeter", "Hello")).expect("link");
        assert_eq!(mesh.close().await, Ok(()));

        assert_eq!(mesh.link(frontend()), Err(MeshError::Closed));
        assert!(mesh.pending().is_empty());
    }

    /// An instance with no operations whose close fails.
    struct Broken {
        name: &'static str,
        operations: OperationTable,
    }

    #[async_trait]
    impl Instance for Broken {
        fn name(&self) -> &str {
            self.name
        }

        fn operations(&self) -> &OperationTable {
            &self.operations
        }

        fn request_response(&self, _ctx: Context, _payload: Payload) -> Mono {
            Box::pin(async { Err::<Payload, _>(ExecutionError::action("broken")) })
        }

        fn fire_and_forget(&self, _ctx: Context, _payload: Payload) {}

        fn request_stream(&self, _ctx: Context, _payload: Payload) -> Flux {
            futures::stream::empty().boxed()
        }

        fn request_channel(&self, _ctx: Context, _payload: Payload, _inbound: Flux) -> Flux {
            futures::stream::empty().boxed()
        }

        fn set_request_response_handler(&self, _index: u32, _handler: RequestResponseHandler) {}

        fn set_fire_and_forget_handler(&self, _index: u32, _handler: FireAndForgetHandler) {}

        fn set_request_stream_handler(&self, _index: u32, _handler: RequestStreamHandler) {}

        fn set_request_channel_handler(&self, _index: u32, _handler: RequestChannelHandler) {}

        async fn close(&self) -> Result<(), ExecutionError> {
            Err(ExecutionError::action(format!("{} would not close", self.name)))
        }
    }

    #[tokio::test]
    async fn test_close_collects_every_failure_and_signals_shutdown() {
        let mesh = Arc::new(Mesh::new());
        mesh.link(Arc::new(Broken { name: "first", operations: OperationTable::default() })).expect("link");
        mesh.link(greeter("greeter", "Hello")).expect("link");
        mesh.link(Arc::new(Broken { name: "second", operations: OperationTable::default() })).expect("link");

        let waiter = {
            let mesh = mesh.clone();
            tokio::spawn(async move { mesh.wait_until_shutdown().await })
        };

        let result = mesh.close().await;
        assert_eq!(
            result,
            Err(MeshError::Close(vec![
                ("first".to_string(), ExecutionError::action("first would not close")),
                ("second".to_string(), ExecutionError::action("second would not close")),
            ]))
        );
        waiter.await.expect("waiter finishes after close");

        // closing twice is a no-op
        assert_eq!(mesh.close().await, Ok(()));
    }
}
