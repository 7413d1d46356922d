use serde::Serialize;

use crate::error::NodeError;

/// The variables visible to a node while it runs.
///
/// Seeded from the caller's inputs and extended with each node's output once
/// that node's level has finished. One scope per execution; never shared
/// between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariableScope {
  variables: serde_json::Map<String, serde_json::Value>,
}

impl VariableScope {
  pub fn new(inputs: serde_json::Map<String, serde_json::Value>) -> Self {
    Self { variables: inputs }
  }

  pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
    self.variables.get(name)
  }

  /// Get a variable, failing if it is not defined.
  pub fn require(&self, name: &str) -> Result<&serde_json::Value, NodeError> {
    self.get(name).ok_or_else(|| NodeError::MissingVariable {
      name: name.to_string(),
    })
  }

  pub fn contains(&self, name: &str) -> bool {
    self.variables.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.variables.len()
  }

  pub fn is_empty(&self) -> bool {
    self.variables.is_empty()
  }

  pub(crate) fn insert(&mut self, name: String, value: serde_json::Value) {
    self.variables.insert(name, value);
  }

  /// The scope as a template rendering context.
  pub(crate) fn to_context(&self) -> minijinja::Value {
    minijinja::Value::from_serialize(&self.variables)
  }

  pub fn into_inner(self) -> serde_json::Map<String, serde_json::Value> {
    self.variables
  }
}

impl From<serde_json::Map<String, serde_json::Value>> for VariableScope {
  fn from(variables: serde_json::Map<String, serde_json::Value>) -> Self {
    Self::new(variables)
  }
}
