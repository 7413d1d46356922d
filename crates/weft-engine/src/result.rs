//! Execution result types.

use serde::{Deserialize, Serialize};

/// Result of a single node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
  pub node_id: String,
  /// Variable the value was written to.
  pub output: String,
  pub value: serde_json::Value,
}

/// Result of a complete workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
  /// Unique execution ID.
  pub execution_id: String,
  /// Output of the terminal node.
  pub output: serde_json::Value,
  /// Final variable scope: inputs plus every node output.
  pub variables: serde_json::Map<String, serde_json::Value>,
  /// Node results in the order they were committed.
  pub node_results: Vec<NodeResult>,
}
