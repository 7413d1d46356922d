//! Built-in transforms run by internal nodes.

use serde_json::Value;
use weft_config::{InternalConfig, InternalOp, Operand};

use crate::error::NodeError;
use crate::scope::VariableScope;
use crate::template;

/// Apply an internal node's transform against the scope.
pub(crate) fn apply(config: &InternalConfig, scope: &VariableScope) -> Result<Value, NodeError> {
  let operands = config
    .operands
    .iter()
    .map(|operand| resolve(operand, scope))
    .collect::<Result<Vec<_>, _>>()?;

  match config.op {
    InternalOp::Identity => single(&operands).cloned(),
    InternalOp::Upper => map_str(single(&operands)?, "upper", str::to_uppercase),
    InternalOp::Lower => map_str(single(&operands)?, "lower", str::to_lowercase),
    InternalOp::Trim => map_str(single(&operands)?, "trim", |s| s.trim().to_string()),
    InternalOp::Length => length(single(&operands)?),
    InternalOp::Concat => Ok(concat(operands)),
    InternalOp::Join => Ok(join(&operands, config.separator.as_deref().unwrap_or(""))),
    InternalOp::Template => {
      let source = config
        .template
        .as_deref()
        .ok_or_else(|| NodeError::invalid_input("template op has no template"))?;
      template::render(source, scope).map(Value::String)
    }
  }
}

fn resolve(operand: &Operand, scope: &VariableScope) -> Result<Value, NodeError> {
  match operand {
    Operand::Variable(name) => scope.require(name).cloned(),
    Operand::Literal(value) => Ok(value.clone()),
  }
}

fn single(operands: &[Value]) -> Result<&Value, NodeError> {
  match operands {
    [value] => Ok(value),
    _ => Err(NodeError::invalid_input(format!(
      "expected exactly one input, got {}",
      operands.len()
    ))),
  }
}

fn map_str(value: &Value, op: &str, f: impl Fn(&str) -> String) -> Result<Value, NodeError> {
  match value {
    Value::String(s) => Ok(Value::String(f(s))),
    other => Err(NodeError::invalid_input(format!(
      "{} expects a string, got {}",
      op,
      kind(other)
    ))),
  }
}

fn length(value: &Value) -> Result<Value, NodeError> {
  let len = match value {
    Value::String(s) => s.chars().count(),
    Value::Array(items) => items.len(),
    Value::Object(map) => map.len(),
    other => {
      return Err(NodeError::invalid_input(format!(
        "length expects a string, array or object, got {}",
        kind(other)
      )));
    }
  };
  Ok(Value::from(len))
}

/// Arrays concatenate into an array; anything else concatenates as text.
fn concat(operands: Vec<Value>) -> Value {
  if operands.iter().all(Value::is_array) {
    let items = operands
      .into_iter()
      .flat_map(|v| match v {
        Value::Array(items) => items,
        _ => Vec::new(),
      })
      .collect();
    return Value::Array(items);
  }

  Value::String(operands.iter().map(stringify).collect())
}

/// A single array operand joins its elements; otherwise the operands are joined.
fn join(operands: &[Value], separator: &str) -> Value {
  let parts: Vec<String> = match operands {
    [Value::Array(items)] => items.iter().map(stringify).collect(),
    _ => operands.iter().map(stringify).collect(),
  };
  Value::String(parts.join(separator))
}

/// Text form of a value: strings as-is, null as empty, the rest as JSON.
pub(crate) fn stringify(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
