//! End-to-end engine tests: parse, bind, execute.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use weft_config::parse;
use weft_credential::{Credential, MemoryDirectory};
use weft_engine::{
  ChannelNotifier, EngineConfig, ExecutionError, ExecutionEvent, NodeError, WorkflowEngine,
};
use weft_platform::{
  Completion, CompletionRequest, FnPlatform, InvokeError, ModelInvoker, PlatformRegistry,
  PlatformStrategy, platforms,
};
use weft_resolver::{Binder, StandardBinder};
use weft_workflow::Pipeline;

/// A platform whose replies take `delay`. Counts calls started and finished.
struct SlowPlatform {
  delay: Duration,
  calls: Arc<AtomicUsize>,
  finished: Arc<AtomicUsize>,
}

struct SlowInvoker {
  delay: Duration,
  calls: Arc<AtomicUsize>,
  finished: Arc<AtomicUsize>,
}

impl PlatformStrategy for SlowPlatform {
  fn bind(&self, _credential: &Credential) -> Result<Arc<dyn ModelInvoker>, InvokeError> {
    Ok(Arc::new(SlowInvoker {
      delay: self.delay,
      calls: self.calls.clone(),
      finished: self.finished.clone(),
    }))
  }
}

#[async_trait]
impl ModelInvoker for SlowInvoker {
  async fn complete(&self, request: CompletionRequest) -> Result<Completion, InvokeError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;
    self.finished.fetch_add(1, Ordering::SeqCst);
    Ok(Completion::text(format!("slow:{}", request.prompt)))
  }
}

fn credential(id: i64, platform: &str) -> Credential {
  Credential {
    id,
    name: format!("cred-{}", id),
    platform: platform.to_string(),
    api_key: "secret".to_string(),
    base_url: None,
  }
}

fn inputs(value: Value) -> serde_json::Map<String, Value> {
  match value {
    Value::Object(map) => map,
    _ => panic!("inputs must be an object"),
  }
}

async fn compile(text: &str, registry: PlatformRegistry, credentials: Vec<Credential>) -> Pipeline {
  let binder = StandardBinder::new(
    MemoryDirectory::from_credentials(credentials),
    Arc::new(registry),
  );
  binder.bind(parse(text).unwrap()).await.unwrap()
}

async fn compile_internal(text: &str) -> Pipeline {
  compile(text, PlatformRegistry::with_builtins(), Vec::new()).await
}

const GREETING: &str = r#"{
  "nodes": [
    { "id": "n1", "type": "InternalNode", "data": { "op": "upper", "input": "$name" }, "output": "greeting" },
    { "id": "n2", "type": "InternalNode", "data": { "op": "concat", "inputs": ["greeting", "!"] }, "output": "result" }
  ]
}"#;

#[tokio::test]
async fn test_greeting_example() {
  let pipeline = compile_internal(GREETING).await;
  let engine = WorkflowEngine::default();

  let result = engine
    .execute(&pipeline, inputs(json!({ "name": "ada" })), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.output, json!("ADA!"));
  assert_eq!(result.variables.get("greeting"), Some(&json!("ADA")));
  assert_eq!(result.variables.get("result"), Some(&json!("ADA!")));
  assert_eq!(result.variables.get("name"), Some(&json!("ada")));
  let order: Vec<&str> = result.node_results.iter().map(|r| r.node_id.as_str()).collect();
  assert_eq!(order, vec!["n1", "n2"]);
}

#[tokio::test]
async fn test_missing_input_fails_at_first_node() {
  let pipeline = compile_internal(GREETING).await;
  let engine = WorkflowEngine::default();

  let err = engine
    .execute(&pipeline, inputs(json!({})), CancellationToken::new())
    .await
    .unwrap_err();

  match err {
    ExecutionError::Node { node_id, source } => {
      assert_eq!(node_id, "n1");
      assert_eq!(
        source,
        NodeError::MissingVariable {
          name: "name".to_string()
        }
      );
    }
    other => panic!("unexpected error: {:?}", other),
  }
}

#[tokio::test]
async fn test_fail_fast_skips_dependents() {
  let text = json!({
    "nodes": [
      { "id": "bad", "type": "InternalNode", "data": { "op": "upper", "input": "$n" } },
      { "id": "ask", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "{{ bad }}" } }
    ]
  })
  .to_string();

  let calls = Arc::new(AtomicUsize::new(0));
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_millis(1),
      calls: calls.clone(),
      finished: Arc::default(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;

  for parallel in [true, false] {
    let engine = WorkflowEngine::new(EngineConfig {
      parallel,
      node_timeout: None,
    });
    let err = engine
      .execute(&pipeline, inputs(json!({ "n": 7 })), CancellationToken::new())
      .await
      .unwrap_err();

    assert_eq!(err.node_id(), Some("bad"));
    assert!(matches!(
      err,
      ExecutionError::Node {
        source: NodeError::InvalidInput { .. },
        ..
      }
    ));
  }
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_first_failure_in_level_order_is_reported() {
  // Both roots fail; "a" is declared first so it is the one reported.
  let text = json!({
    "nodes": [
      { "id": "a", "type": "InternalNode", "data": { "op": "identity", "input": "$missing_a" } },
      { "id": "b", "type": "InternalNode", "data": { "op": "identity", "input": "$missing_b" } },
      { "id": "c", "type": "InternalNode", "data": { "op": "concat", "inputs": ["a", "b"] } }
    ]
  })
  .to_string();
  let pipeline = compile_internal(&text).await;

  for parallel in [true, false] {
    let engine = WorkflowEngine::new(EngineConfig {
      parallel,
      node_timeout: None,
    });
    let err = engine
      .execute(&pipeline, inputs(json!({})), CancellationToken::new())
      .await
      .unwrap_err();
    assert_eq!(err.node_id(), Some("a"));
  }
}

#[tokio::test]
async fn test_parallel_failure_does_not_wait_for_siblings() {
  let text = json!({
    "nodes": [
      { "id": "bad", "type": "InternalNode", "data": { "op": "upper", "input": "$n" } },
      { "id": "ask", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "hi" } },
      { "id": "done", "type": "InternalNode", "data": { "op": "concat", "inputs": ["bad", "ask"] } }
    ]
  })
  .to_string();
  let calls = Arc::new(AtomicUsize::new(0));
  let finished = Arc::new(AtomicUsize::new(0));
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_millis(500),
      calls: calls.clone(),
      finished: finished.clone(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;

  let started = tokio::time::Instant::now();
  let err = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({ "n": 7 })), CancellationToken::new())
    .await
    .unwrap_err();
  let elapsed = started.elapsed();

  assert_eq!(err.node_id(), Some("bad"));
  assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);

  // The sibling was aborted before it could finish.
  tokio::time::sleep(Duration::from_millis(700)).await;
  assert!(calls.load(Ordering::SeqCst) <= 1);
  assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_earlier_sibling_still_wins_over_later_failure() {
  // "slow" is declared first, so a fast failure in "bad" waits for it and
  // the earlier failure is the one reported.
  let text = json!({
    "nodes": [
      { "id": "slow", "type": "LLMNode", "timeout_ms": 50, "data": { "credentialId": 1, "prompt": "hi" } },
      { "id": "bad", "type": "InternalNode", "data": { "op": "upper", "input": "$n" } },
      { "id": "done", "type": "InternalNode", "data": { "op": "concat", "inputs": ["slow", "bad"] } }
    ]
  })
  .to_string();
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_secs(5),
      calls: Arc::default(),
      finished: Arc::default(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;

  let err = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({ "n": 7 })), CancellationToken::new())
    .await
    .unwrap_err();

  assert_eq!(err.node_id(), Some("slow"));
  assert!(matches!(
    err,
    ExecutionError::Node {
      source: NodeError::Timeout { timeout_ms: 50 },
      ..
    }
  ));
}

#[tokio::test]
async fn test_parallel_and_sequential_agree() {
  let text = json!({
    "nodes": [
      { "id": "list", "type": "InternalNode", "data": { "op": "identity", "input": "$words" } },
      { "id": "count", "type": "InternalNode", "data": { "op": "length", "input": "list" } },
      { "id": "joined", "type": "InternalNode", "data": { "op": "join", "input": "list", "separator": " " } },
      { "id": "shout", "type": "InternalNode", "data": { "op": "upper", "input": "joined" } },
      { "id": "summary", "type": "InternalNode", "data": { "op": "template", "template": "{{ shout }} ({{ count }})" } }
    ]
  })
  .to_string();
  let pipeline = compile_internal(&text).await;
  let args = json!({ "words": ["hello", "there"] });

  let parallel = WorkflowEngine::default()
    .execute(&pipeline, inputs(args.clone()), CancellationToken::new())
    .await
    .unwrap();
  let sequential = WorkflowEngine::new(EngineConfig {
    parallel: false,
    node_timeout: None,
  })
  .execute(&pipeline, inputs(args), CancellationToken::new())
  .await
  .unwrap();

  assert_eq!(parallel.output, json!("HELLO THERE (2)"));
  assert_eq!(parallel.output, sequential.output);
  assert_eq!(parallel.variables, sequential.variables);
  assert_eq!(parallel.node_results, sequential.node_results);
}

#[tokio::test]
async fn test_echo_platform_renders_prompt() {
  let text = json!({
    "nodes": [
      { "id": "topic", "type": "InternalNode", "data": { "op": "trim", "input": "$raw" } },
      { "id": "ask", "type": "LLMNode", "data": {
        "credentialId": 5,
        "prompt": "Write about {{ topic }}",
        "system": "Be brief"
      } }
    ]
  })
  .to_string();
  let pipeline = compile(
    &text,
    PlatformRegistry::with_builtins(),
    vec![credential(5, platforms::ECHO)],
  )
  .await;

  let result = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({ "raw": "  rust " })), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.output, json!("Be brief\nWrite about rust"));
}

#[tokio::test]
async fn test_platform_error_is_attributed_to_node() {
  let text = json!({
    "nodes": [{ "id": "ask", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "hi" } }]
  })
  .to_string();
  let registry = PlatformRegistry::new();
  registry.register(
    "flaky",
    Arc::new(FnPlatform::new(|_, _| Err(InvokeError::unavailable("503")))),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "flaky")]).await;

  let err = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({})), CancellationToken::new())
    .await
    .unwrap_err();

  assert_eq!(err.node_id(), Some("ask"));
  assert!(matches!(
    err,
    ExecutionError::Node {
      source: NodeError::Invoke(InvokeError::Unavailable { .. }),
      ..
    }
  ));
}

#[tokio::test]
async fn test_node_timeout() {
  let text = json!({
    "nodes": [
      { "id": "ask", "type": "LLMNode", "timeout_ms": 20, "data": { "credentialId": 1, "prompt": "hi" } }
    ]
  })
  .to_string();
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_secs(5),
      calls: Arc::new(AtomicUsize::new(0)),
      finished: Arc::default(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;

  let err = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({})), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    ExecutionError::Node {
      source: NodeError::Timeout { timeout_ms: 20 },
      ..
    }
  ));
}

#[tokio::test]
async fn test_engine_default_timeout() {
  let text = json!({
    "nodes": [{ "id": "ask", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "hi" } }]
  })
  .to_string();
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_secs(5),
      calls: Arc::new(AtomicUsize::new(0)),
      finished: Arc::default(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;

  let engine = WorkflowEngine::new(EngineConfig {
    parallel: true,
    node_timeout: Some(Duration::from_millis(10)),
  });
  let err = engine
    .execute(&pipeline, inputs(json!({})), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    ExecutionError::Node {
      source: NodeError::Timeout { timeout_ms: 10 },
      ..
    }
  ));
}

#[tokio::test]
async fn test_cancellation_stops_execution() {
  let text = json!({
    "nodes": [
      { "id": "a", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "a" } },
      { "id": "b", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "b" } },
      { "id": "after", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "{{ a }} {{ b }}" } }
    ]
  })
  .to_string();
  let calls = Arc::new(AtomicUsize::new(0));
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_secs(5),
      calls: calls.clone(),
      finished: Arc::default(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });

  let err = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({})), cancel)
    .await
    .unwrap_err();

  assert!(matches!(err, ExecutionError::Cancelled));
  // Only the first level was ever started.
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dropping_execution_aborts_running_nodes() {
  let text = json!({
    "nodes": [
      { "id": "a", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "a" } },
      { "id": "b", "type": "LLMNode", "data": { "credentialId": 1, "prompt": "b" } },
      { "id": "after", "type": "InternalNode", "data": { "op": "concat", "inputs": ["a", "b"] } }
    ]
  })
  .to_string();
  let calls = Arc::new(AtomicUsize::new(0));
  let finished = Arc::new(AtomicUsize::new(0));
  let registry = PlatformRegistry::new();
  registry.register(
    "slow",
    Arc::new(SlowPlatform {
      delay: Duration::from_millis(200),
      calls: calls.clone(),
      finished: finished.clone(),
    }),
  );
  let pipeline = compile(&text, registry, vec![credential(1, "slow")]).await;
  let engine = WorkflowEngine::default();

  // The caller gives up without touching the token.
  let run = engine.execute(&pipeline, inputs(json!({})), CancellationToken::new());
  assert!(
    tokio::time::timeout(Duration::from_millis(30), run)
      .await
      .is_err()
  );

  tokio::time::sleep(Duration::from_millis(400)).await;
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let pipeline = compile_internal(GREETING).await;
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = WorkflowEngine::default()
    .execute(&pipeline, inputs(json!({ "name": "ada" })), cancel)
    .await
    .unwrap_err();
  assert!(matches!(err, ExecutionError::Cancelled));
}

#[tokio::test]
async fn test_concurrent_executions_share_pipeline() {
  let pipeline = Arc::new(compile_internal(GREETING).await);
  let engine = Arc::new(WorkflowEngine::default());

  let handles: Vec<_> = ["ada", "grace", "linus", "barbara"]
    .into_iter()
    .map(|name| {
      let pipeline = pipeline.clone();
      let engine = engine.clone();
      tokio::spawn(async move {
        let result = engine
          .execute(&pipeline, inputs(json!({ "name": name })), CancellationToken::new())
          .await
          .unwrap();
        (name, result)
      })
    })
    .collect();

  for handle in handles {
    let (name, result) = handle.await.unwrap();
    assert_eq!(result.output, json!(format!("{}!", name.to_uppercase())));
    assert_eq!(result.variables.get("name"), Some(&json!(name)));
  }
}

#[tokio::test]
async fn test_events_are_emitted_in_order() {
  let pipeline = compile_internal(GREETING).await;
  let (tx, mut rx) = mpsc::unbounded_channel();
  let engine = WorkflowEngine::with_notifier(EngineConfig::default(), ChannelNotifier::new(tx));

  engine
    .execute(&pipeline, inputs(json!({ "name": "ada" })), CancellationToken::new())
    .await
    .unwrap();
  drop(engine);

  let mut events = Vec::new();
  while let Some(event) = rx.recv().await {
    events.push(event);
  }

  assert_eq!(events.len(), 6);
  assert!(matches!(events[0], ExecutionEvent::WorkflowStarted { nodes: 2, .. }));
  assert!(matches!(&events[1], ExecutionEvent::NodeStarted { node_id, .. } if node_id == "n1"));
  assert!(
    matches!(&events[2], ExecutionEvent::NodeCompleted { node_id, output, .. } if node_id == "n1" && output == "greeting")
  );
  assert!(matches!(&events[3], ExecutionEvent::NodeStarted { node_id, .. } if node_id == "n2"));
  assert!(
    matches!(&events[4], ExecutionEvent::NodeCompleted { value, .. } if value == &json!("ADA!"))
  );
  assert!(matches!(events[5], ExecutionEvent::WorkflowCompleted { .. }));
}

#[tokio::test]
async fn test_execute_node_in_isolation() {
  let pipeline = compile_internal(GREETING).await;
  let engine = WorkflowEngine::default();
  let node = pipeline.get_node("n2").unwrap();

  let scope = weft_engine::VariableScope::new(inputs(json!({ "greeting": "HI" })));
  let value = engine.execute_node(node, &scope).await.unwrap();
  assert_eq!(value, json!("HI!"));
  assert_eq!(scope.len(), 1);
}
