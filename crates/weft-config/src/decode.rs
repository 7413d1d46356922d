//! Typed decoding of node data.
//!
//! The parser only reads what it needs to find edges. Everything a node's
//! type requires of its `data` is checked here, once the graph is known to
//! be acyclic.

use minijinja::Environment;
use serde::Deserialize;
use serde_json::Value;

use crate::error::NodeDataError;
use crate::node::{InternalConfig, InternalOp, LlmConfig, NodeDef, NodeKind, Operand, TypeTag};

/// Credential ids arrive as numbers or numeric strings depending on the editor.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
  Number(i64),
  Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLlmData {
  #[serde(default, alias = "llmId", alias = "credential_id")]
  credential_id: Option<IdValue>,
  #[serde(default)]
  prompt: Option<String>,
  #[serde(default)]
  system: Option<String>,
  #[serde(default)]
  model: Option<String>,
  #[serde(default)]
  temperature: Option<f32>,
  #[serde(default, alias = "max_tokens")]
  max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawInternalData {
  op: InternalOp,
  #[serde(default)]
  input: Option<Value>,
  #[serde(default)]
  inputs: Vec<Value>,
  #[serde(default)]
  separator: Option<String>,
  #[serde(default)]
  template: Option<String>,
}

impl NodeDef {
  /// Decode `data` into the typed configuration for this node's type.
  ///
  /// `is_output` tells whether a bare string names an output declared in the
  /// same document, which decides if it is a variable or a literal operand.
  /// Unknown type tags decode to [`NodeKind::Unknown`].
  pub fn decode(&self, is_output: impl Fn(&str) -> bool) -> Result<NodeKind, NodeDataError> {
    match TypeTag::of(&self.node_type) {
      TypeTag::Llm => self.decode_llm().map(NodeKind::Llm),
      TypeTag::Internal => self.decode_internal(is_output).map(NodeKind::Internal),
      TypeTag::Other => Ok(NodeKind::Unknown {
        type_name: self.node_type.clone(),
      }),
    }
  }

  /// Variables this node reads, as far as its data can be read.
  ///
  /// Malformed data yields whatever references could still be found;
  /// [`NodeDef::decode`] reports the problem later.
  pub(crate) fn references(&self, is_output: impl Fn(&str) -> bool) -> Vec<String> {
    let text = |key: &str| self.data.get(key).and_then(Value::as_str);
    let mut names = Vec::new();

    match TypeTag::of(&self.node_type) {
      TypeTag::Llm => {
        for source in [text("prompt"), text("system")].into_iter().flatten() {
          names.extend(template_variables(source).unwrap_or_default());
        }
      }
      TypeTag::Internal => {
        let single = self.data.get("input").into_iter();
        let many = self
          .data
          .get("inputs")
          .and_then(Value::as_array)
          .into_iter()
          .flatten();
        names.extend(
          single
            .chain(many)
            .filter_map(|v| Operand::classify(v.clone(), &is_output).variable().map(str::to_string)),
        );
        if let Some(source) = text("template") {
          names.extend(template_variables(source).unwrap_or_default());
        }
      }
      TypeTag::Other => {}
    }

    names
  }

  fn invalid(&self, message: impl Into<String>) -> NodeDataError {
    NodeDataError {
      node_id: self.node_id.clone(),
      message: message.into(),
    }
  }

  fn checked_template(&self, source: &str) -> Result<(), NodeDataError> {
    template_variables(source)
      .map(|_| ())
      .map_err(|e| self.invalid(format!("invalid template: {}", e)))
  }

  fn decode_llm(&self) -> Result<LlmConfig, NodeDataError> {
    let raw: RawLlmData =
      serde_json::from_value(self.data.clone()).map_err(|e| self.invalid(e.to_string()))?;

    let credential_id = match raw.credential_id {
      Some(IdValue::Number(id)) => id,
      Some(IdValue::Text(text)) => text
        .trim()
        .parse()
        .map_err(|_| self.invalid(format!("credentialId '{}' is not numeric", text)))?,
      None => return Err(self.invalid("missing credentialId")),
    };

    let prompt = raw.prompt.ok_or_else(|| self.invalid("missing prompt"))?;
    self.checked_template(&prompt)?;
    if let Some(system) = &raw.system {
      self.checked_template(system)?;
    }

    Ok(LlmConfig {
      credential_id,
      prompt,
      system: raw.system,
      model: raw.model,
      temperature: raw.temperature,
      max_tokens: raw.max_tokens,
    })
  }

  fn decode_internal(
    &self,
    is_output: impl Fn(&str) -> bool,
  ) -> Result<InternalConfig, NodeDataError> {
    let raw: RawInternalData =
      serde_json::from_value(self.data.clone()).map_err(|e| self.invalid(e.to_string()))?;

    if raw.input.is_some() && !raw.inputs.is_empty() {
      return Err(self.invalid("use either 'input' or 'inputs', not both"));
    }

    let operands: Vec<Operand> = raw
      .input
      .into_iter()
      .chain(raw.inputs)
      .map(|v| Operand::classify(v, &is_output))
      .collect();

    match raw.op {
      op if op.is_unary() => {
        if operands.len() != 1 {
          return Err(self.invalid(format!(
            "op '{:?}' takes exactly one input, got {}",
            op,
            operands.len()
          )));
        }
      }
      InternalOp::Concat | InternalOp::Join => {
        if operands.is_empty() {
          return Err(self.invalid("op needs at least one input"));
        }
      }
      InternalOp::Template => {
        let template = raw
          .template
          .as_deref()
          .ok_or_else(|| self.invalid("template op needs 'template'"))?;
        self.checked_template(template)?;
      }
      _ => {}
    }

    Ok(InternalConfig {
      op: raw.op,
      operands,
      separator: raw.separator,
      template: raw.template,
    })
  }
}

/// Top-level variables a template reads.
fn template_variables(source: &str) -> Result<Vec<String>, minijinja::Error> {
  let env = Environment::new();
  let template = env.template_from_str(source)?;
  let mut names: Vec<String> = template.undeclared_variables(false).into_iter().collect();
  names.sort();
  Ok(names)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn node(node_type: &str, data: Value) -> NodeDef {
    NodeDef {
      node_id: "n1".to_string(),
      output: "n1".to_string(),
      node_type: node_type.to_string(),
      data,
      timeout_ms: None,
    }
  }

  fn no_outputs(_: &str) -> bool {
    false
  }

  #[test]
  fn test_decode_llm_with_editor_aliases() {
    let def = node(
      "llmNode",
      json!({ "llmId": "42", "prompt": "Hello {{ who }}", "maxTokens": 64 }),
    );

    let NodeKind::Llm(config) = def.decode(no_outputs).unwrap() else {
      panic!("expected llm node");
    };
    assert_eq!(config.credential_id, 42);
    assert_eq!(config.prompt, "Hello {{ who }}");
    assert_eq!(config.max_tokens, Some(64));
  }

  #[test]
  fn test_decode_llm_without_credential() {
    let def = node("LLMNode", json!({ "prompt": "hi" }));
    let err = def.decode(no_outputs).unwrap_err();
    assert_eq!(err.node_id, "n1");
    assert_eq!(err.message, "missing credentialId");
  }

  #[test]
  fn test_decode_llm_without_prompt() {
    let def = node("LLMNode", json!({ "credentialId": 1 }));
    assert_eq!(def.decode(no_outputs).unwrap_err().message, "missing prompt");
  }

  #[test]
  fn test_decode_llm_non_numeric_credential() {
    let def = node("LLMNode", json!({ "credentialId": "abc", "prompt": "hi" }));
    assert!(def.decode(no_outputs).is_err());
  }

  #[test]
  fn test_decode_classifies_operands() {
    let def = node("InternalNode", json!({ "op": "concat", "inputs": ["greeting", "!", "$name", 3] }));

    let NodeKind::Internal(config) = def.decode(|name| name == "greeting").unwrap() else {
      panic!("expected internal node");
    };
    assert_eq!(config.op, InternalOp::Concat);
    assert_eq!(
      config.operands,
      vec![
        Operand::Variable("greeting".to_string()),
        Operand::Literal(json!("!")),
        Operand::Variable("name".to_string()),
        Operand::Literal(json!(3)),
      ]
    );
  }

  #[test]
  fn test_decode_unary_op_arity() {
    let def = node("InternalNode", json!({ "op": "upper", "inputs": ["a", "b"] }));
    assert!(def.decode(no_outputs).is_err());
  }

  #[test]
  fn test_decode_unknown_op() {
    let def = node("InternalNode", json!({ "op": "explode", "input": "a" }));
    assert!(def.decode(no_outputs).unwrap_err().message.contains("explode"));
  }

  #[test]
  fn test_decode_template_op_needs_template() {
    let def = node("InternalNode", json!({ "op": "template" }));
    assert!(def.decode(no_outputs).is_err());
  }

  #[test]
  fn test_decode_invalid_template() {
    let def = node("LLMNode", json!({ "credentialId": 1, "prompt": "{{ unclosed" }));
    assert!(
      def
        .decode(no_outputs)
        .unwrap_err()
        .message
        .starts_with("invalid template")
    );
  }

  #[test]
  fn test_decode_unknown_type() {
    let def = node("startNode", json!({}));
    assert_eq!(
      def.decode(no_outputs).unwrap(),
      NodeKind::Unknown {
        type_name: "startNode".to_string()
      }
    );
  }

  #[test]
  fn test_references_survive_bad_data() {
    let def = node("InternalNode", json!({ "op": "explode", "inputs": ["$a", "b", 1] }));
    assert_eq!(def.references(|name| name == "b"), vec!["a", "b"]);

    let def = node("LLMNode", json!({ "prompt": "{{ topic }} and {{ tone }}" }));
    assert_eq!(def.references(no_outputs), vec!["tone", "topic"]);
  }
}
