use serde::{Deserialize, Serialize};

/// A node in a parsed graph.
///
/// `data` is kept as the document wrote it. [`NodeDef::decode`] turns it
/// into a typed [`NodeKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
  pub node_id: String,
  /// Variable the node's result is written to. Defaults to the node id.
  pub output: String,
  /// The `type` tag as written.
  pub node_type: String,
  /// The node's `data` object. A missing `data` is an empty object.
  pub data: serde_json::Value,
  pub timeout_ms: Option<u64>,
}

/// Which family a type tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeTag {
  Llm,
  Internal,
  Other,
}

impl TypeTag {
  pub(crate) fn of(node_type: &str) -> Self {
    match node_type {
      "LLMNode" | "llmNode" => TypeTag::Llm,
      "InternalNode" | "internalNode" => TypeTag::Internal,
      _ => TypeTag::Other,
    }
  }
}

/// The typed configuration of a node, selected by its `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  /// Calls a language model through a credential-bound platform.
  Llm(LlmConfig),
  /// Runs a built-in transform.
  Internal(InternalConfig),
  /// A type tag this version does not know. Rejected when binding.
  Unknown { type_name: String },
}

impl NodeKind {
  /// The canonical type tag.
  pub fn type_name(&self) -> &str {
    match self {
      NodeKind::Llm(_) => "LLMNode",
      NodeKind::Internal(_) => "InternalNode",
      NodeKind::Unknown { type_name } => type_name,
    }
  }
}

/// Configuration of an `LLMNode`.
///
/// `prompt` and `system` are minijinja templates rendered against the
/// variable scope when the node runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
  pub credential_id: i64,
  pub prompt: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub system: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,
}

/// Built-in transforms available to `InternalNode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalOp {
  Identity,
  Upper,
  Lower,
  Trim,
  Length,
  Concat,
  Join,
  Template,
}

impl InternalOp {
  /// Whether the op takes exactly one operand.
  pub fn is_unary(self) -> bool {
    matches!(
      self,
      InternalOp::Identity
        | InternalOp::Upper
        | InternalOp::Lower
        | InternalOp::Trim
        | InternalOp::Length
    )
  }
}

/// Configuration of an `InternalNode`.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalConfig {
  pub op: InternalOp,
  pub operands: Vec<Operand>,
  /// Separator for `join`.
  pub separator: Option<String>,
  /// Template source for `template`.
  pub template: Option<String>,
}

/// An input to an internal transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
  /// Read from the variable scope.
  Variable(String),
  /// A constant.
  Literal(serde_json::Value),
}

impl Operand {
  /// Classify a raw operand.
  ///
  /// `$name` always reads variable `name`. A bare string is a variable only
  /// when it names an output declared in the same document; otherwise it is
  /// a literal, as is every non-string value.
  pub(crate) fn classify(raw: serde_json::Value, is_output: impl Fn(&str) -> bool) -> Self {
    match raw {
      serde_json::Value::String(s) => {
        if let Some(name) = s.strip_prefix('$') {
          Operand::Variable(name.to_string())
        } else if is_output(&s) {
          Operand::Variable(s)
        } else {
          Operand::Literal(serde_json::Value::String(s))
        }
      }
      other => Operand::Literal(other),
    }
  }

  pub fn variable(&self) -> Option<&str> {
    match self {
      Operand::Variable(name) => Some(name),
      Operand::Literal(_) => None,
    }
  }
}
