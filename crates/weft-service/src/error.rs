use thiserror::Error;
use weft_config::ParseError;
use weft_engine::ExecutionError;
use weft_resolver::BindError;
use weft_store::{DefinitionId, StoreError};

/// Errors surfaced to callers of the service.
///
/// Each variant identifies the stage that failed; see [`ServiceError::stage`].
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("failed to parse workflow graph: {0}")]
  Parse(#[from] ParseError),

  #[error("failed to bind workflow: {0}")]
  Bind(#[from] BindError),

  #[error("workflow execution failed: {0}")]
  Execution(#[from] ExecutionError),

  #[error("storage failed: {0}")]
  Store(#[from] StoreError),

  #[error("workflow definition {id} does not exist")]
  NotFound { id: DefinitionId },

  #[error("definition key '{key}' is already used by definition {existing}")]
  DuplicateKey { key: String, existing: DefinitionId },

  /// The definition exists but no graph has been saved for it yet.
  #[error("workflow definition {id} has no graph")]
  EmptyGraph { id: DefinitionId },

  #[error("workflow definition {id} is disabled")]
  Disabled { id: DefinitionId },
}

impl ServiceError {
  /// Short name of the failing stage.
  pub fn stage(&self) -> &'static str {
    match self {
      ServiceError::Parse(_) => "parse",
      ServiceError::Bind(_) => "bind",
      ServiceError::Execution(_) => "execute",
      ServiceError::Store(_) => "store",
      ServiceError::NotFound { .. }
      | ServiceError::DuplicateKey { .. }
      | ServiceError::EmptyGraph { .. }
      | ServiceError::Disabled { .. } => "definition",
    }
  }

  /// The node an execution failure is attributed to.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      ServiceError::Execution(e) => e.node_id(),
      _ => None,
    }
  }
}
