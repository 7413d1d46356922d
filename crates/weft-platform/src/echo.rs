use std::sync::Arc;

use async_trait::async_trait;
use weft_credential::Credential;

use crate::error::InvokeError;
use crate::request::{Completion, CompletionRequest};
use crate::strategy::{ModelInvoker, PlatformStrategy};

/// A platform that answers with the rendered prompt.
///
/// Lets a workflow be dry-run end to end without a provider account.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoPlatform;

impl PlatformStrategy for EchoPlatform {
  fn bind(&self, credential: &Credential) -> Result<Arc<dyn ModelInvoker>, InvokeError> {
    Ok(Arc::new(EchoInvoker {
      credential_id: credential.id,
    }))
  }
}

#[derive(Debug)]
struct EchoInvoker {
  credential_id: i64,
}

#[async_trait]
impl ModelInvoker for EchoInvoker {
  async fn complete(&self, request: CompletionRequest) -> Result<Completion, InvokeError> {
    tracing::debug!(credential_id = self.credential_id, "echo completion");
    let text = match request.system {
      Some(system) => format!("{}\n{}", system, request.prompt),
      None => request.prompt,
    };
    Ok(Completion {
      text,
      model: request.model,
    })
  }
}
