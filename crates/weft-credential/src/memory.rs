use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::credential::{Credential, CredentialId};
use crate::directory::{CredentialDirectory, DirectoryError};

/// An in-memory credential directory.
///
/// Used for ad-hoc test runs where credentials come from a file, and in tests.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
  credentials: RwLock<HashMap<CredentialId, Credential>>,
}

impl MemoryDirectory {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a directory from a list of credentials. Later entries win on id clashes.
  pub fn from_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
    let map = credentials.into_iter().map(|c| (c.id, c)).collect();
    Self {
      credentials: RwLock::new(map),
    }
  }

  /// Insert or replace a credential.
  pub async fn insert(&self, credential: Credential) {
    self
      .credentials
      .write()
      .await
      .insert(credential.id, credential);
  }

  /// Remove a credential, returning it if present.
  pub async fn remove(&self, id: CredentialId) -> Option<Credential> {
    self.credentials.write().await.remove(&id)
  }
}

#[async_trait]
impl CredentialDirectory for MemoryDirectory {
  async fn lookup(&self, id: CredentialId) -> Result<Option<Credential>, DirectoryError> {
    Ok(self.credentials.read().await.get(&id).cloned())
  }
}
