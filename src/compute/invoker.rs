// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use crate::compute::operations::{
    Direction, FireAndForgetHandler, Flux, HandlerTable, Mono, Operation, OperationTable,
    OperationType, RequestChannelHandler, RequestResponseHandler, RequestStreamHandler,
};
use crate::compute::payload::Payload;
use crate::config::consts::STREAM_BUFFER_SIZE;
use crate::engine::{Context, Data, Namespaces, Runnable, Target};
use crate::errors::ExecutionError;
use crate::observability::messages::mesh::InvocationFailed;
use crate::observability::messages::pipeline::PipelineStarted;
use crate::observability::messages::StructuredLog;
use crate::traits::{Codec, Instance};

/// Operations an instance calls out to, bound by the mesh.
///
/// The client is built before the processor so the `invoke` action can
/// resolve it under `client:invoker`; the [`Invoker`] that later wraps the
/// processor shares it, and the mesh installs forwarding handlers into it
/// through the invoker's `set_*_handler` methods.
pub struct ImportClient {
    operations: OperationTable,
    handlers: HandlerTable,
    codec: Arc<dyn Codec>,
}

impl ImportClient {
    /// Declares `imports`. Each distinct target gets one index, in sorted
    /// order, carrying all four interaction shapes.
    pub fn new(imports: impl IntoIterator<Item = Target>, codec: Arc<dyn Codec>) -> Self {
        let targets: BTreeSet<(String, String)> = imports
            .into_iter()
            .map(|target| (target.namespace, target.operation))
            .collect();
        Self {
            operations: operation_table(Direction::Import, targets.iter()),
            handlers: HandlerTable::default(),
            codec,
        }
    }

    pub fn operations(&self) -> &OperationTable {
        &self.operations
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Calls an imported operation and decodes its response. An empty
    /// response decodes to `null`.
    pub async fn request_response(
        &self,
        ctx: &Context,
        namespace: &str,
        operation: &str,
        input: &Value,
    ) -> Result<Value, ExecutionError> {
        let index = self
            .operations
            .find(Direction::Import, OperationType::RequestResponse, namespace, operation)
            .map(|op| op.index)
            .ok_or_else(|| {
                ExecutionError::UnknownOperation(format!("{}/{} is not imported", namespace, operation))
            })?;
        let handler = self
            .handlers
            .request_response(index)
            .ok_or_else(|| ExecutionError::Unroutable {
                namespace: namespace.to_string(),
                operation: operation.to_string(),
            })?;

        let request = Payload::for_index(index, self.codec.encode(input)?);
        let response = handler(ctx.clone(), request).await?;
        decode_value(self.codec.as_ref(), response.data())
    }
}

impl fmt::Debug for ImportClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportClient")
            .field("imports", &self.operations.len())
            .field("handlers", &self.handlers)
            .field("content_type", &self.codec.content_type())
            .finish()
    }
}

/// A service function exported at one index.
#[derive(Clone)]
struct Function {
    target: Target,
    runnable: Runnable,
}

/// What invocation tasks need, shared so they can outlive the call that
/// spawned them.
struct Exports {
    instance: String,
    functions: Vec<Function>,
    codec: Arc<dyn Codec>,
}

impl Exports {
    fn lookup(&self, payload: &Payload) -> Result<Function, ExecutionError> {
        let index = payload.index().ok_or_else(|| {
            ExecutionError::UnknownOperation("payload metadata carries no operation index".to_string())
        })?;
        self.functions
            .get(index as usize)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownOperation(format!("index {} on '{}'", index, self.instance)))
    }

    /// Runs `function` with `bytes` decoded as its input.
    async fn call(
        &self,
        function: &Function,
        ctx: &Context,
        kind: OperationType,
        bytes: &[u8],
    ) -> Result<Value, ExecutionError> {
        let data = Data::with_input(decode_value(self.codec.as_ref(), bytes)?);
        let ctx = ctx.with_target(function.target.namespace.as_str(), function.target.operation.as_str());
        let kind = kind.to_string();
        let started = PipelineStarted {
            kind: &kind,
            name: function.runnable.name(),
            step_count: function.runnable.len(),
        };
        started.log();
        let span = started.span("invoke");
        function.runnable.run(&ctx, &data).instrument(span).await
    }

    fn encode(&self, value: &Value) -> Result<Payload, ExecutionError> {
        if value.is_null() {
            return Ok(Payload::empty());
        }
        Ok(Payload::new(self.codec.encode(value)?, Bytes::new()))
    }
}

/// Exposes a processor's services as a mesh [`Instance`].
///
/// Every `(namespace, operation)` gets an index in sorted order and is
/// exported once per interaction shape at that index. Calls are decoded
/// with the import client's codec and run as `Data { "input": value }`.
pub struct Invoker {
    operations: OperationTable,
    exports: Arc<Exports>,
    client: Arc<ImportClient>,
}

impl Invoker {
    pub fn new(name: impl Into<String>, namespaces: Namespaces, client: Arc<ImportClient>) -> Self {
        let functions: Vec<Function> = namespaces
            .into_iter()
            .flat_map(|(namespace, operations)| {
                operations.into_iter().map(move |(operation, runnable)| Function {
                    target: Target {
                        namespace: namespace.clone(),
                        operation,
                    },
                    runnable,
                })
            })
            .collect();

        let targets: Vec<(String, String)> = functions
            .iter()
            .map(|f| (f.target.namespace.clone(), f.target.operation.clone()))
            .collect();
        let operations = operation_table(Direction::Export, targets.iter())
            .iter()
            .chain(client.operations().iter())
            .cloned()
            .collect();

        Self {
            operations,
            exports: Arc::new(Exports {
                instance: name.into(),
                codec: client.codec().clone(),
                functions,
            }),
            client,
        }
    }

    pub fn client(&self) -> &Arc<ImportClient> {
        &self.client
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("name", &self.exports.instance)
            .field("operations", &self.operations.len())
            .field("client", &self.client)
            .finish()
    }
}

#[async_trait]
impl Instance for Invoker {
    fn name(&self) -> &str {
        &self.exports.instance
    }

    fn operations(&self) -> &OperationTable {
        &self.operations
    }

    fn request_response(&self, ctx: Context, payload: Payload) -> Mono {
        let exports = self.exports.clone();
        Box::pin(async move {
            let function = exports.lookup(&payload)?;
            let result = exports
                .call(&function, &ctx, OperationType::RequestResponse, payload.data())
                .await?;
            exports.encode(&result)
        })
    }

    fn fire_and_forget(&self, ctx: Context, payload: Payload) {
        let exports = self.exports.clone();
        tokio::spawn(async move {
            let function = match exports.lookup(&payload) {
                Ok(function) => function,
                Err(error) => {
                    InvocationFailed {
                        instance: &exports.instance,
                        namespace: "",
                        operation: "",
                        error: &error,
                    }
                    .log();
                    return;
                }
            };
            if let Err(error) = exports
                .call(&function, &ctx, OperationType::FireAndForget, payload.data())
                .await
            {
                InvocationFailed {
                    instance: &exports.instance,
                    namespace: &function.target.namespace,
                    operation: &function.target.operation,
                    error: &error,
                }
                .log();
            }
        });
    }

    fn request_stream(&self, ctx: Context, payload: Payload) -> Flux {
        let function = match self.exports.lookup(&payload) {
            Ok(function) => function,
            Err(error) => return stream::once(async move { Err(error) }).boxed(),
        };

        let exports = self.exports.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER_SIZE);
        tokio::spawn(async move {
            let result = exports
                .call(&function, &ctx, OperationType::RequestStream, payload.data())
                .await;
            let items = match result {
                Ok(Value::Array(items)) => items,
                Ok(Value::Null) => Vec::new(),
                Ok(value) => vec![value],
                Err(error) => {
                    let _ = tx.send(Err(error)).await;
                    return;
                }
            };
            for item in items {
                let encoded = exports.encode(&item);
                let failed = encoded.is_err();
                // a closed receiver means the consumer went away
                if tx.send(encoded).await.is_err() || failed {
                    return;
                }
            }
        });
        ReceiverStream::new(rx).boxed()
    }

    fn request_channel(&self, ctx: Context, payload: Payload, inbound: Flux) -> Flux {
        let exports = self.exports.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER_SIZE);
        tokio::spawn(async move {
            let function = match exports.lookup(&payload) {
                Ok(function) => function,
                Err(error) => {
                    let _ = tx.send(Err(error)).await;
                    return;
                }
            };

            let mut inputs = stream::once(async move { Ok(payload) }).boxed().chain(inbound);
            while let Some(next) = inputs.next().await {
                let outcome = match next {
                    Ok(request) => exports
                        .call(&function, &ctx, OperationType::RequestChannel, request.data())
                        .await
                        .and_then(|value| exports.encode(&value)),
                    Err(error) => Err(error),
                };
                let failed = outcome.is_err();
                if tx.send(outcome).await.is_err() || failed {
                    return;
                }
            }
        });
        ReceiverStream::new(rx).boxed()
    }

    fn set_request_response_handler(&self, index: u32, handler: RequestResponseHandler) {
        self.client.handlers().set_request_response(index, handler);
    }

    fn set_fire_and_forget_handler(&self, index: u32, handler: FireAndForgetHandler) {
        self.client.handlers().set_fire_and_forget(index, handler);
    }

    fn set_request_stream_handler(&self, index: u32, handler: RequestStreamHandler) {
        self.client.handlers().set_request_stream(index, handler);
    }

    fn set_request_channel_handler(&self, index: u32, handler: RequestChannelHandler) {
        self.client.handlers().set_request_channel(index, handler);
    }
}

/// One operation per interaction shape for each target, indexed by position.
fn operation_table<'a>(
    direction: Direction,
    targets: impl Iterator<Item = &'a (String, String)>,
) -> OperationTable {
    targets
        .enumerate()
        .flat_map(|(index, (namespace, operation))| {
            OperationType::ALL.into_iter().map(move |kind| Operation {
                index: index as u32,
                kind,
                direction,
                namespace: namespace.clone(),
                operation: operation.clone(),
            })
        })
        .collect()
}

fn decode_value(codec: &dyn Codec, bytes: &[u8]) -> Result<Value, ExecutionError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    codec.decode(bytes).map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::JsonCodec;
    use crate::config::{Config, Resolver};
    use crate::engine::{Processor, Registry};
    use serde_json::json;

    const CONFIG: &str = r#"
services:
  math.v1.Calculator:
    double:
      steps:
        - name: double
          uses: assign
          with: { value: "input.n * 2" }
    explode:
      steps:
        - name: explode
          uses: assign
          with: { value: "[input.n, input.n + 1, input.n + 2]" }
    fail:
      steps:
        - name: fail
          uses: filter
          with: { condition: "input.missing" }
  greeting.v1.Greeter:
    sayHello:
      steps:
        - name: greet
          uses: assign
          with: { value: "'Hello, ' + input.name" }
"#;

    fn invoker() -> Invoker {
        let config = Config::from_str_with_format(CONFIG, "yaml").unwrap();
        let processor = Processor::new(&config, Registry::with_core_actions(), Resolver::new()).unwrap();
        let client = Arc::new(ImportClient::new(Vec::new(), Arc::new(JsonCodec)));
        Invoker::new("calculator", processor.namespaces(), client)
    }

    fn index_of(invoker: &Invoker, namespace: &str, operation: &str) -> u32 {
        invoker
            .operations()
            .find(Direction::Export, OperationType::RequestResponse, namespace, operation)
            .unwrap()
            .index
    }

    fn request(index: u32, input: Value) -> Payload {
        Payload::for_index(index, serde_json::to_vec(&input).unwrap())
    }

    #[test]
    fn test_indexes_follow_sorted_targets() {
        let invoker = invoker();
        assert_eq!(index_of(&invoker, "greeting.v1.Greeter", "sayHello"), 0);
        assert_eq!(index_of(&invoker, "math.v1.Calculator", "double"), 1);
        assert_eq!(index_of(&invoker, "math.v1.Calculator", "explode"), 2);
        assert_eq!(index_of(&invoker, "math.v1.Calculator", "fail"), 3);
        // four shapes per target
        assert_eq!(invoker.operations().exports().count(), 16);
    }

    #[tokio::test]
    async fn test_request_response_encodes_result() {
        let invoker = invoker();
        let index = index_of(&invoker, "greeting.v1.Greeter", "sayHello");
        let response = invoker
            .request_response(Context::new(), request(index, json!({"name": "Ada"})))
            .await
            .unwrap();
        assert_eq!(response.data().as_ref(), br#""Hello, Ada""#);
    }

    #[tokio::test]
    async fn test_unknown_index_is_an_error() {
        let invoker = invoker();
        let result = invoker
            .request_response(Context::new(), request(99, json!({})))
            .await;
        assert!(matches!(result, Err(ExecutionError::UnknownOperation(_))));

        let result = invoker
            .request_response(Context::new(), Payload::new(Bytes::new(), Bytes::from_static(&[0, 1])))
            .await;
        assert!(matches!(result, Err(ExecutionError::UnknownOperation(_))));
    }

    #[tokio::test]
    async fn test_request_stream_emits_array_elements() {
        let invoker = invoker();
        let index = index_of(&invoker, "math.v1.Calculator", "explode");
        let payloads: Vec<_> = invoker
            .request_stream(Context::new(), request(index, json!({"n": 5})))
            .collect()
            .await;

        let values: Vec<Value> = payloads
            .into_iter()
            .map(|p| serde_json::from_slice(p.unwrap().data()).unwrap())
            .collect();
        assert_eq!(values, vec![json!(5), json!(6), json!(7)]);
    }

    #[tokio::test]
    async fn test_request_stream_scalar_is_single_payload() {
        let invoker = invoker();
        let index = index_of(&invoker, "math.v1.Calculator", "double");
        let payloads: Vec<_> = invoker
            .request_stream(Context::new(), request(index, json!({"n": 4})))
            .collect()
            .await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].as_ref().unwrap().data().as_ref(), b"8");
    }

    #[tokio::test]
    async fn test_request_channel_runs_each_inbound_payload() {
        let invoker = invoker();
        let index = index_of(&invoker, "math.v1.Calculator", "double");
        let inbound = stream::iter(vec![
            Ok(Payload::new(Bytes::from_static(br#"{"n":2}"#), Bytes::new())),
            Ok(Payload::new(Bytes::from_static(br#"{"n":3}"#), Bytes::new())),
        ])
        .boxed();

        let outbound: Vec<_> = invoker
            .request_channel(Context::new(), request(index, json!({"n": 1})), inbound)
            .map(|p| p.unwrap().into_data())
            .collect()
            .await;
        assert_eq!(outbound, vec![Bytes::from("2"), Bytes::from("4"), Bytes::from("6")]);
    }

    #[tokio::test]
    async fn test_request_channel_stops_at_first_failure() {
        let invoker = invoker();
        let index = index_of(&invoker, "math.v1.Calculator", "double");
        let inbound = stream::iter(vec![
            Ok(Payload::new(Bytes::from_static(b"{not json"), Bytes::new())),
            Ok(Payload::new(Bytes::from_static(br#"{"n":3}"#), Bytes::new())),
        ])
        .boxed();

        let outbound: Vec<_> = invoker
            .request_channel(Context::new(), request(index, json!({"n": 1})), inbound)
            .collect()
            .await;
        assert_eq!(outbound.len(), 2);
        assert!(outbound[0].is_ok());
        assert!(matches!(outbound[1], Err(ExecutionError::Codec(_))));
    }

    #[tokio::test]
    async fn test_import_client_without_route_is_unroutable() {
        let client = ImportClient::new(
            vec![Target {
                namespace: "inventory.v1.Stock".to_string(),
                operation: "reserve".to_string(),
            }],
            Arc::new(JsonCodec),
        );
        assert_eq!(client.operations().imports().count(), 4);

        let result = client
            .request_response(&Context::new(), "inventory.v1.Stock", "reserve", &json!({}))
            .await;
        assert!(matches!(result, Err(ExecutionError::Unroutable { .. })));

        let result = client
            .request_response(&Context::new(), "inventory.v1.Stock", "release", &json!({}))
            .await;
        assert!(matches!(result, Err(ExecutionError::UnknownOperation(_))));
    }
}
