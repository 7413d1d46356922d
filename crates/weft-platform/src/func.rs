use std::sync::Arc;

use async_trait::async_trait;
use weft_credential::Credential;

use crate::error::InvokeError;
use crate::request::{Completion, CompletionRequest};
use crate::strategy::{ModelInvoker, PlatformStrategy};

type CompleteFn =
  dyn Fn(&Credential, &CompletionRequest) -> Result<Completion, InvokeError> + Send + Sync;

/// A strategy backed by a closure.
///
/// Handy for embedding a platform client that is already synchronous, and
/// for tests.
#[derive(Clone)]
pub struct FnPlatform {
  complete: Arc<CompleteFn>,
}

impl FnPlatform {
  pub fn new<F>(complete: F) -> Self
  where
    F: Fn(&Credential, &CompletionRequest) -> Result<Completion, InvokeError>
      + Send
      + Sync
      + 'static,
  {
    Self {
      complete: Arc::new(complete),
    }
  }
}

impl PlatformStrategy for FnPlatform {
  fn bind(&self, credential: &Credential) -> Result<Arc<dyn ModelInvoker>, InvokeError> {
    Ok(Arc::new(FnInvoker {
      credential: credential.clone(),
      complete: self.complete.clone(),
    }))
  }
}

struct FnInvoker {
  credential: Credential,
  complete: Arc<CompleteFn>,
}

#[async_trait]
impl ModelInvoker for FnInvoker {
  async fn complete(&self, request: CompletionRequest) -> Result<Completion, InvokeError> {
    (self.complete)(&self.credential, &request)
  }
}
