use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use weft_engine::{ExecutionNotifier, ExecutionResult, NoopNotifier, WorkflowEngine};
use weft_resolver::Binder;
use weft_store::{
  DefinitionFilter, DefinitionId, DefinitionStatus, DefinitionStore, NewDefinition, Page,
  PageRequest, StoreError, WorkflowDefinition,
};
use weft_workflow::Pipeline;

use crate::error::ServiceError;

/// Definition management plus the compile/execute boundary.
///
/// Generic over the store, the binder and the engine's notifier so each can
/// be swapped independently.
pub struct WorkflowService<S, B, N = NoopNotifier>
where
  S: DefinitionStore,
  B: Binder,
  N: ExecutionNotifier,
{
  store: S,
  binder: B,
  engine: WorkflowEngine<N>,
}

impl<S, B, N> WorkflowService<S, B, N>
where
  S: DefinitionStore,
  B: Binder,
  N: ExecutionNotifier,
{
  pub fn new(store: S, binder: B, engine: WorkflowEngine<N>) -> Self {
    Self {
      store,
      binder,
      engine,
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn engine(&self) -> &WorkflowEngine<N> {
    &self.engine
  }

  /// Create a definition. A non-blank key must not be in use.
  #[instrument(name = "create_definition", skip(self, definition), fields(name = %definition.name))]
  pub async fn create_definition(
    &self,
    definition: NewDefinition,
  ) -> Result<DefinitionId, ServiceError> {
    self.validate_key_unique(None, &definition).await?;
    let id = match self.store.create(&definition).await {
      Ok(id) => id,
      Err(e) => return Err(self.key_conflict(e).await),
    };
    info!(definition_id = id, "definition_created");
    Ok(id)
  }

  /// Replace a definition. Its key may only collide with itself.
  #[instrument(name = "update_definition", skip(self, definition))]
  pub async fn update_definition(
    &self,
    id: DefinitionId,
    definition: NewDefinition,
  ) -> Result<(), ServiceError> {
    self.require(id).await?;
    self.validate_key_unique(Some(id), &definition).await?;
    if let Err(e) = self.store.update(id, &definition).await {
      return Err(self.key_conflict(e).await);
    }
    info!(definition_id = id, "definition_updated");
    Ok(())
  }

  /// Replace only the graph text of a definition.
  #[instrument(name = "update_graph", skip(self, graph_text))]
  pub async fn update_graph(&self, id: DefinitionId, graph_text: &str) -> Result<(), ServiceError> {
    self.require(id).await?;
    self.store.update_graph(id, graph_text).await?;
    info!(definition_id = id, bytes = graph_text.len(), "graph_updated");
    Ok(())
  }

  #[instrument(name = "delete_definition", skip(self))]
  pub async fn delete_definition(&self, id: DefinitionId) -> Result<(), ServiceError> {
    self.require(id).await?;
    self.store.delete(id).await?;
    info!(definition_id = id, "definition_deleted");
    Ok(())
  }

  pub async fn get_definition(
    &self,
    id: DefinitionId,
  ) -> Result<Option<WorkflowDefinition>, ServiceError> {
    Ok(self.store.get(id).await?)
  }

  pub async fn get_definition_by_key(
    &self,
    key: &str,
  ) -> Result<Option<WorkflowDefinition>, ServiceError> {
    Ok(self.store.get_by_key(key).await?)
  }

  pub async fn list_definitions(
    &self,
    filter: &DefinitionFilter,
    page: PageRequest,
  ) -> Result<Page<WorkflowDefinition>, ServiceError> {
    Ok(self.store.list_page(filter, page).await?)
  }

  /// Parse and bind graph text into a pipeline.
  pub async fn compile(&self, graph_text: &str) -> Result<Pipeline, ServiceError> {
    let graph = weft_config::parse(graph_text)?;
    Ok(self.binder.bind(graph).await?)
  }

  /// Compile and execute an ad-hoc graph in one call.
  #[instrument(name = "test_workflow", skip_all)]
  pub async fn test(
    &self,
    graph_text: &str,
    inputs: serde_json::Map<String, serde_json::Value>,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, ServiceError> {
    let pipeline = self.compile(graph_text).await.inspect_err(|e| {
      warn!(stage = e.stage(), error = %e, "compile_failed");
    })?;
    Ok(self.engine.execute(&pipeline, inputs, cancel).await?)
  }

  /// Load a stored definition, compile its graph and execute it.
  #[instrument(name = "run_definition", skip(self, inputs, cancel))]
  pub async fn run_definition(
    &self,
    id: DefinitionId,
    inputs: serde_json::Map<String, serde_json::Value>,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, ServiceError> {
    let definition = self.require(id).await?;
    if definition.status == DefinitionStatus::Disabled {
      return Err(ServiceError::Disabled { id });
    }
    if definition.graph_text.trim().is_empty() {
      return Err(ServiceError::EmptyGraph { id });
    }
    self.test(&definition.graph_text, inputs, cancel).await
  }

  async fn require(&self, id: DefinitionId) -> Result<WorkflowDefinition, ServiceError> {
    self
      .store
      .get(id)
      .await?
      .ok_or(ServiceError::NotFound { id })
  }

  /// Report a key claimed between our check and the write as a duplicate.
  async fn key_conflict(&self, error: StoreError) -> ServiceError {
    let StoreError::DuplicateKey(key) = error else {
      return error.into();
    };
    warn!(key = %key, "definition key claimed concurrently");
    match self.store.get_by_key(&key).await {
      Ok(Some(existing)) => ServiceError::DuplicateKey {
        key,
        existing: existing.id,
      },
      Ok(None) => StoreError::DuplicateKey(key).into(),
      Err(e) => e.into(),
    }
  }

  /// Blank keys are never checked. On update, a match on the same id is fine.
  async fn validate_key_unique(
    &self,
    id: Option<DefinitionId>,
    definition: &NewDefinition,
  ) -> Result<(), ServiceError> {
    let Some(key) = definition.normalized_key() else {
      return Ok(());
    };
    match self.store.get_by_key(key).await? {
      Some(existing) if Some(existing.id) != id => Err(ServiceError::DuplicateKey {
        key: key.to_string(),
        existing: existing.id,
      }),
      _ => Ok(()),
    }
  }
}
