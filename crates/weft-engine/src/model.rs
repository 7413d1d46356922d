//! Model node execution.

use weft_platform::CompletionRequest;
use weft_workflow::ModelBinding;

use crate::error::NodeError;
use crate::scope::VariableScope;
use crate::template;

/// Render the prompt, call the bound invoker, and return the reply text.
pub(crate) async fn invoke(
  binding: &ModelBinding,
  scope: &VariableScope,
) -> Result<serde_json::Value, NodeError> {
  let config = &binding.config;

  let prompt = template::render(&config.prompt, scope)?;
  let system = config
    .system
    .as_deref()
    .map(|s| template::render(s, scope))
    .transpose()?;

  let request = CompletionRequest {
    prompt,
    system,
    model: config.model.clone(),
    temperature: config.temperature,
    max_tokens: config.max_tokens,
  };

  let completion = binding.invoker.complete(request).await?;
  Ok(serde_json::Value::String(completion.text))
}
