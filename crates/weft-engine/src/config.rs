use std::time::Duration;

/// Configuration for the workflow engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Run the nodes of a level concurrently. When false, nodes run one at a
  /// time in topological order. Results and reported errors are the same
  /// either way.
  pub parallel: bool,
  /// Timeout for nodes that do not set their own `timeout_ms`.
  pub node_timeout: Option<Duration>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      parallel: true,
      node_timeout: None,
    }
  }
}
