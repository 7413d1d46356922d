use serde::{Deserialize, Serialize};

/// A rendered request to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
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

impl CompletionRequest {
  pub fn new(prompt: impl Into<String>) -> Self {
    Self {
      prompt: prompt.into(),
      system: None,
      model: None,
      temperature: None,
      max_tokens: None,
    }
  }
}

/// A model's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
  pub text: String,
  /// Model that actually served the request, when the platform reports it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
}

impl Completion {
  pub fn text(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      model: None,
    }
  }
}
