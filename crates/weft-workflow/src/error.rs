use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("cycle detected between nodes: {}", nodes.join(", "))]
  Cycle { nodes: Vec<String> },
}
