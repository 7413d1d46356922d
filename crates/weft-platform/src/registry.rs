//! Platform strategy registry.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::echo::EchoPlatform;
use crate::platforms;
use crate::strategy::PlatformStrategy;

static GLOBAL: OnceLock<Arc<PlatformRegistry>> = OnceLock::new();

/// Maps platform tags to invocation strategies.
///
/// Tags are matched case-insensitively, so "OpenAI" and "openai" select the
/// same strategy. Reads vastly outnumber writes: strategies are registered at
/// startup and then looked up by every compilation.
#[derive(Default)]
pub struct PlatformRegistry {
  strategies: RwLock<HashMap<String, Arc<dyn PlatformStrategy>>>,
}

impl PlatformRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a registry holding the built-in strategies.
  pub fn with_builtins() -> Self {
    let registry = Self::new();
    registry.register(platforms::ECHO, Arc::new(EchoPlatform));
    registry
  }

  /// The process-wide registry, created with the built-ins on first use.
  pub fn global() -> Arc<PlatformRegistry> {
    GLOBAL
      .get_or_init(|| Arc::new(PlatformRegistry::with_builtins()))
      .clone()
  }

  /// Register a strategy under `platform`, replacing any previous one.
  pub fn register(&self, platform: &str, strategy: Arc<dyn PlatformStrategy>) {
    let key = normalize(platform);
    debug!(platform = %key, "registering platform strategy");
    self
      .strategies
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .insert(key, strategy);
  }

  /// Look up the strategy for `platform`.
  pub fn get(&self, platform: &str) -> Option<Arc<dyn PlatformStrategy>> {
    self
      .strategies
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .get(&normalize(platform))
      .cloned()
  }

  /// Whether a strategy is registered for `platform`.
  pub fn contains(&self, platform: &str) -> bool {
    self.get(platform).is_some()
  }

  /// Registered platform tags, sorted.
  pub fn platforms(&self) -> Vec<String> {
    let mut tags: Vec<String> = self
      .strategies
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .keys()
      .cloned()
      .collect();
    tags.sort();
    tags
  }
}

impl std::fmt::Debug for PlatformRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PlatformRegistry")
      .field("platforms", &self.platforms())
      .finish()
  }
}

fn normalize(platform: &str) -> String {
  platform.trim().to_ascii_lowercase()
}
