use async_trait::async_trait;
use thiserror::Error;

use crate::credential::{Credential, CredentialId};

/// Errors raised by a credential directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
  /// The backend could not be reached or returned an error.
  #[error("credential directory unavailable: {message}")]
  Unavailable { message: String },
}

impl DirectoryError {
  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable {
      message: message.into(),
    }
  }
}

/// Lookup of stored credentials by id.
///
/// An absent credential is `Ok(None)`; `Err` is reserved for backend failures.
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
  async fn lookup(&self, id: CredentialId) -> Result<Option<Credential>, DirectoryError>;
}
