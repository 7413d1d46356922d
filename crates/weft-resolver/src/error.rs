use thiserror::Error;
use weft_config::NodeDataError;
use weft_credential::DirectoryError;
use weft_platform::InvokeError;
use weft_workflow::WorkflowError;

/// Errors that can occur while binding a graph into a pipeline.
///
/// Binding is all-or-nothing: any of these means no pipeline was produced.
#[derive(Debug, Error)]
pub enum BindError {
  /// The graph contains a cycle.
  #[error("cycle detected in workflow graph: {}", nodes.join(", "))]
  CyclicGraph { nodes: Vec<String> },

  /// A node's data does not match what its type requires.
  #[error(transparent)]
  InvalidNodeData(#[from] NodeDataError),

  /// A node's type tag is not one the binder knows.
  #[error("node '{node_id}' has unknown type '{type_name}'")]
  UnknownNodeType { node_id: String, type_name: String },

  /// A model node references a credential the directory does not have.
  #[error("node '{node_id}' references unknown credential {credential_id}")]
  UnresolvedCredential { node_id: String, credential_id: i64 },

  /// The credential's platform has no registered strategy.
  #[error("node '{node_id}' uses unsupported platform '{platform}'")]
  UnsupportedPlatform { node_id: String, platform: String },

  /// The platform strategy refused the credential.
  #[error("failed to bind platform for node '{node_id}': {source}")]
  PlatformBinding {
    node_id: String,
    #[source]
    source: InvokeError,
  },

  /// No terminal was designated and the graph has more than one sink.
  #[error("cannot choose a result node, graph has several sinks: {}", sinks.join(", "))]
  AmbiguousTerminal { sinks: Vec<String> },

  /// The credential directory failed.
  #[error("credential lookup failed: {0}")]
  Directory(#[from] DirectoryError),

  /// The compiled structure is inconsistent.
  #[error("invalid pipeline: {0}")]
  Workflow(#[from] WorkflowError),
}
