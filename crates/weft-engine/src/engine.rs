//! Workflow execution engine.
//!
//! The `WorkflowEngine` walks a compiled pipeline level by level. Nodes of
//! one level only depend on earlier levels, so they may run concurrently;
//! their outputs are committed to the scope once the level has settled.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, instrument, warn};
use weft_workflow::{Behavior, CompiledNode, Pipeline};

use crate::config::EngineConfig;
use crate::error::{ExecutionError, NodeError};
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::model;
use crate::result::{ExecutionResult, NodeResult};
use crate::scope::VariableScope;
use crate::transform;

/// Outcome of each node in a level, in level order.
///
/// Shorter than the level when sequential execution stopped at a failure.
type LevelOutcome = Vec<Result<Value, ExecutionError>>;

/// The workflow execution engine.
///
/// Generic over `N: ExecutionNotifier` to allow different notification strategies.
/// Use `WorkflowEngine::new()` for a default engine with no-op notifications,
/// or `WorkflowEngine::with_notifier()` to provide a custom notifier.
///
/// The engine holds no per-execution state; one instance can run any number
/// of executions at once.
pub struct WorkflowEngine<N: ExecutionNotifier = NoopNotifier> {
  config: EngineConfig,
  notifier: N,
}

impl WorkflowEngine<NoopNotifier> {
  /// Create a new workflow engine with no-op notifications.
  pub fn new(config: EngineConfig) -> Self {
    Self::with_notifier(config, NoopNotifier)
  }
}

impl Default for WorkflowEngine<NoopNotifier> {
  fn default() -> Self {
    Self::new(EngineConfig::default())
  }
}

impl<N: ExecutionNotifier> WorkflowEngine<N> {
  /// Create a new workflow engine with a custom notifier.
  pub fn with_notifier(config: EngineConfig, notifier: N) -> Self {
    Self { config, notifier }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Execute a pipeline with the given input variables.
  ///
  /// Returns the terminal node's output along with the final scope. The
  /// first failing node, in topological order, stops the run and is
  /// reported as [`ExecutionError::Node`]. Cancelling `cancel` stops
  /// scheduling, aborts in-flight nodes, and returns
  /// [`ExecutionError::Cancelled`].
  #[instrument(
    name = "workflow_execute",
    skip(self, pipeline, inputs, cancel),
    fields(nodes = pipeline.len(), parallel = self.config.parallel)
  )]
  pub async fn execute(
    &self,
    pipeline: &Pipeline,
    inputs: serde_json::Map<String, Value>,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, ExecutionError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(execution_id = %execution_id, inputs = inputs.len(), "workflow_started");
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      nodes: pipeline.len(),
    });

    let result = self
      .run_levels(pipeline, VariableScope::new(inputs), &execution_id, &cancel)
      .await;

    match &result {
      Ok(_) => {
        info!(execution_id = %execution_id, "workflow_completed");
        self.notifier.notify(ExecutionEvent::WorkflowCompleted {
          execution_id: execution_id.clone(),
        });
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "workflow_failed");
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id: execution_id.clone(),
          error: e.to_string(),
        });
      }
    }

    result
  }

  /// Execute a single node against a caller-supplied scope.
  ///
  /// This is for debugging: no events are emitted and the scope is not
  /// modified. The engine's default timeout applies.
  pub async fn execute_node(
    &self,
    node: &CompiledNode,
    scope: &VariableScope,
  ) -> Result<Value, NodeError> {
    run_node(node, scope, self.config.node_timeout).await
  }

  async fn run_levels(
    &self,
    pipeline: &Pipeline,
    mut scope: VariableScope,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<ExecutionResult, ExecutionError> {
    let mut node_results = Vec::with_capacity(pipeline.len());

    for level in pipeline.levels() {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, "workflow cancelled");
        return Err(ExecutionError::Cancelled);
      }

      let outcomes = if self.config.parallel && level.len() > 1 {
        self.run_parallel(level, &scope, execution_id, cancel).await?
      } else {
        self
          .run_sequential(level, &scope, execution_id, cancel)
          .await?
      };

      // Commit in level order; the first failure wins.
      for (node, outcome) in level.iter().zip(outcomes) {
        match outcome {
          Ok(value) => {
            info!(
              execution_id = %execution_id,
              node_id = %node.node_id,
              output = %node.output,
              "node_completed"
            );
            self.notifier.notify(ExecutionEvent::NodeCompleted {
              execution_id: execution_id.to_string(),
              node_id: node.node_id.clone(),
              output: node.output.clone(),
              value: value.clone(),
            });
            scope.insert(node.output.clone(), value.clone());
            node_results.push(NodeResult {
              node_id: node.node_id.clone(),
              output: node.output.clone(),
              value,
            });
          }
          Err(e) => {
            error!(
              execution_id = %execution_id,
              node_id = %node.node_id,
              error = %e,
              "node_failed"
            );
            self.notifier.notify(ExecutionEvent::NodeFailed {
              execution_id: execution_id.to_string(),
              node_id: node.node_id.clone(),
              error: e.to_string(),
            });
            return Err(e);
          }
        }
      }
    }

    let output = scope
      .get(&pipeline.terminal().output)
      .cloned()
      .unwrap_or(Value::Null);

    Ok(ExecutionResult {
      execution_id: execution_id.to_string(),
      output,
      variables: scope.into_inner(),
      node_results,
    })
  }

  /// Spawn one task per node, each reading the same snapshot of the scope.
  ///
  /// Returns once every node before the first failure (in level order) has
  /// settled. Tasks still running at that point are aborted, as they are when
  /// the run is cancelled or this future is dropped.
  async fn run_parallel(
    &self,
    level: &[CompiledNode],
    scope: &VariableScope,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<LevelOutcome, ExecutionError> {
    let snapshot = Arc::new(scope.clone());
    let default_timeout = self.config.node_timeout;

    let mut pending: FuturesUnordered<_> = level
      .iter()
      .enumerate()
      .map(|(index, node)| {
        self.notify_started(execution_id, node);
        let node = node.clone();
        let scope = Arc::clone(&snapshot);
        let handle = AbortOnDropHandle::new(tokio::spawn(async move {
          run_node(&node, &scope, default_timeout).await
        }));
        async move { (index, handle.await) }
      })
      .collect();

    let mut slots: Vec<Option<Result<Value, ExecutionError>>> =
      level.iter().map(|_| None).collect();
    // Only outcomes below this index are needed.
    let mut bound = level.len();

    while slots[..bound].iter().any(Option::is_none) {
      let (index, joined) = tokio::select! {
        next = pending.next() => match next {
          Some(next) => next,
          None => break,
        },
        _ = cancel.cancelled() => {
          warn!(execution_id = %execution_id, "workflow cancelled during node execution");
          return Err(ExecutionError::Cancelled);
        }
      };

      let node = &level[index];
      let outcome = match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(ExecutionError::Node {
          node_id: node.node_id.clone(),
          source,
        }),
        Err(e) => Err(ExecutionError::Join {
          node_id: node.node_id.clone(),
          message: e.to_string(),
        }),
      };
      if outcome.is_err() && index < bound {
        bound = index + 1;
      }
      slots[index] = Some(outcome);
    }

    if bound < level.len() {
      warn!(
        execution_id = %execution_id,
        aborted = pending.len(),
        "level failed, aborting remaining nodes"
      );
    }

    Ok(slots.into_iter().take(bound).flatten().collect())
  }

  /// Run nodes one at a time, stopping at the first failure.
  async fn run_sequential(
    &self,
    level: &[CompiledNode],
    scope: &VariableScope,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<LevelOutcome, ExecutionError> {
    let mut outcomes = Vec::with_capacity(level.len());

    for node in level {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, "workflow cancelled");
        return Err(ExecutionError::Cancelled);
      }

      self.notify_started(execution_id, node);
      let result = tokio::select! {
        result = run_node(node, scope, self.config.node_timeout) => result,
        _ = cancel.cancelled() => {
          warn!(execution_id = %execution_id, node_id = %node.node_id, "workflow cancelled during node execution");
          return Err(ExecutionError::Cancelled);
        }
      };

      match result {
        Ok(value) => outcomes.push(Ok(value)),
        Err(source) => {
          outcomes.push(Err(ExecutionError::Node {
            node_id: node.node_id.clone(),
            source,
          }));
          break;
        }
      }
    }

    Ok(outcomes)
  }

  fn notify_started(&self, execution_id: &str, node: &CompiledNode) {
    info!(
      execution_id = %execution_id,
      node_id = %node.node_id,
      node_type = node.type_name(),
      "node_started"
    );
    self.notifier.notify(ExecutionEvent::NodeStarted {
      execution_id: execution_id.to_string(),
      node_id: node.node_id.clone(),
    });
  }
}

/// Run one node's behavior, bounded by its timeout.
///
/// The node's own `timeout_ms` takes precedence over `default_timeout`.
async fn run_node(
  node: &CompiledNode,
  scope: &VariableScope,
  default_timeout: Option<Duration>,
) -> Result<Value, NodeError> {
  let work = async {
    match &node.behavior {
      Behavior::Internal(config) => transform::apply(config, scope),
      Behavior::Model(binding) => model::invoke(binding, scope).await,
    }
  };

  match node.timeout_ms.map(Duration::from_millis).or(default_timeout) {
    Some(limit) => tokio::time::timeout(limit, work)
      .await
      .map_err(|_| NodeError::Timeout {
        timeout_ms: limit.as_millis() as u64,
      })?,
    None => work.await,
  }
}
