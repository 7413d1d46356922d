//! Template rendering against the variable scope.

use minijinja::{Environment, UndefinedBehavior};

use crate::error::NodeError;
use crate::scope::VariableScope;

/// Render a minijinja template with the scope as context.
///
/// Undefined variables are an error, not an empty string.
pub(crate) fn render(source: &str, scope: &VariableScope) -> Result<String, NodeError> {
  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);
  env
    .render_str(source, scope.to_context())
    .map_err(|e| NodeError::Template {
      message: e.to_string(),
    })
}
