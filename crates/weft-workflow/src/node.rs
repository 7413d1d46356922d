use std::sync::Arc;

use weft_config::{InternalConfig, LlmConfig};
use weft_platform::ModelInvoker;

/// A node with every resource it needs to run.
#[derive(Debug, Clone)]
pub struct CompiledNode {
  pub node_id: String,
  /// Variable the node's result is written to.
  pub output: String,
  pub timeout_ms: Option<u64>,
  pub behavior: Behavior,
}

impl CompiledNode {
  /// Type tag of the node, for logs and events.
  pub fn type_name(&self) -> &'static str {
    match self.behavior {
      Behavior::Model(_) => "LLMNode",
      Behavior::Internal(_) => "InternalNode",
    }
  }
}

/// What a compiled node does when it runs.
#[derive(Debug, Clone)]
pub enum Behavior {
  /// Call a model through a credential-bound invoker.
  Model(ModelBinding),
  /// Run a built-in transform.
  Internal(InternalConfig),
}

/// A model node's configuration plus the invoker bound at compile time.
#[derive(Clone)]
pub struct ModelBinding {
  pub credential_id: i64,
  pub platform: String,
  pub config: LlmConfig,
  pub invoker: Arc<dyn ModelInvoker>,
}

impl std::fmt::Debug for ModelBinding {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ModelBinding")
      .field("credential_id", &self.credential_id)
      .field("platform", &self.platform)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
