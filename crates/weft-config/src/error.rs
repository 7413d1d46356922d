use thiserror::Error;

/// Errors that can occur while parsing a graph document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
  /// The graph text is blank.
  #[error("empty graph definition")]
  Empty,

  /// The document is not valid JSON or does not have the expected shape.
  #[error("malformed graph document: {message}")]
  Malformed { message: String },

  /// The document declares no nodes.
  #[error("graph has no nodes")]
  NoNodes,

  /// A node entry has no `type` tag.
  #[error("node '{node_id}' is missing a type")]
  MissingType { node_id: String },

  /// Two nodes share the same id.
  #[error("duplicate node id: {node_id}")]
  DuplicateNode { node_id: String },

  /// Two nodes write the same output variable.
  #[error("output '{output}' is declared by both '{first}' and '{second}'")]
  DuplicateOutput {
    output: String,
    first: String,
    second: String,
  },

  /// An edge or the terminal designation names a node that does not exist.
  #[error("reference to unknown node '{node_id}'")]
  UnknownNode { node_id: String },
}

/// A node's `data` does not match what its type requires.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid data for node '{node_id}': {message}")]
pub struct NodeDataError {
  pub node_id: String,
  pub message: String,
}
