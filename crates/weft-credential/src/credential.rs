use serde::{Deserialize, Serialize};

/// Numeric credential identifier, as referenced from node configuration.
pub type CredentialId = i64;

/// A stored credential for one provider platform.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
  pub id: CredentialId,
  #[serde(default)]
  pub name: String,
  /// Platform tag, e.g. "OpenAI" or "Ollama".
  pub platform: String,
  /// Secret material. Redacted from `Debug` output.
  pub api_key: String,
  /// Endpoint override for self-hosted or proxied platforms.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,
}

impl std::fmt::Debug for Credential {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credential")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("platform", &self.platform)
      .field("api_key", &"[REDACTED]")
      .field("base_url", &self.base_url)
      .finish()
  }
}
