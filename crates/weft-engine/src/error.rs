//! Error types for workflow execution.

use thiserror::Error;
use weft_platform::InvokeError;

/// Why a single node failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
  /// The node reads a variable that is not in scope.
  #[error("variable '{name}' is not defined")]
  MissingVariable { name: String },

  /// An input has the wrong shape for the node's operation.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  /// A prompt or template failed to render.
  #[error("template error: {message}")]
  Template { message: String },

  /// The model platform call failed.
  #[error(transparent)]
  Invoke(#[from] InvokeError),

  /// The node did not finish in time.
  #[error("timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },
}

impl NodeError {
  pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput {
      message: message.into(),
    }
  }
}

/// Errors that can occur during workflow execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// A node failed; execution stopped there.
  #[error("node '{node_id}' failed: {source}")]
  Node {
    node_id: String,
    #[source]
    source: NodeError,
  },

  /// Workflow execution was cancelled.
  #[error("workflow execution cancelled")]
  Cancelled,

  /// A spawned node task panicked or was aborted.
  #[error("node task for '{node_id}' did not complete: {message}")]
  Join { node_id: String, message: String },
}

impl ExecutionError {
  /// The node the error is attributed to, if any.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      ExecutionError::Node { node_id, .. } | ExecutionError::Join { node_id, .. } => {
        Some(node_id)
      }
      ExecutionError::Cancelled => None,
    }
  }
}
