use thiserror::Error;

/// Errors from binding or calling a model platform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
  /// The credential lacks something the platform needs (endpoint, key format, ...).
  #[error("invalid credential configuration: {message}")]
  Configuration { message: String },

  /// The platform refused the request.
  #[error("platform rejected request: {message}")]
  Rejected { message: String },

  /// The platform could not be reached.
  #[error("platform unavailable: {message}")]
  Unavailable { message: String },

  /// The platform answered with something unusable.
  #[error("invalid platform response: {message}")]
  InvalidResponse { message: String },
}

impl InvokeError {
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration {
      message: message.into(),
    }
  }

  pub fn rejected(message: impl Into<String>) -> Self {
    Self::Rejected {
      message: message.into(),
    }
  }

  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable {
      message: message.into(),
    }
  }
}
