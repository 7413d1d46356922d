use std::sync::Arc;

use async_trait::async_trait;
use weft_credential::Credential;

use crate::error::InvokeError;
use crate::request::{Completion, CompletionRequest};

/// A model invoker bound to one credential.
///
/// Invokers are shared by every execution of a compiled pipeline, so they
/// must be safe to call concurrently.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
  async fn complete(&self, request: CompletionRequest) -> Result<Completion, InvokeError>;
}

/// Produces invokers for one platform family.
pub trait PlatformStrategy: Send + Sync {
  /// Bind an invoker to `credential`. Called once per model node at compile time.
  fn bind(&self, credential: &Credential) -> Result<Arc<dyn ModelInvoker>, InvokeError>;
}
