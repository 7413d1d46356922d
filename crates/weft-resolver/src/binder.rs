use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use weft_config::{GraphDef, LlmConfig, NodeDef, NodeKind};
use weft_credential::{Credential, CredentialDirectory};
use weft_platform::{ModelInvoker, PlatformRegistry};
use weft_workflow::{Behavior, CompiledNode, Graph, ModelBinding, Pipeline, WorkflowError};

use crate::error::BindError;

/// Binder transforms a parsed graph into a compiled pipeline.
#[async_trait]
pub trait Binder: Send + Sync {
  /// Bind a graph definition into a pipeline.
  ///
  /// This process:
  /// 1. Orders the graph topologically (a cycle fails here, before any
  ///    node data is decoded or credential looked up)
  /// 2. Chooses the result node
  /// 3. Decodes every node's data into its typed configuration
  /// 4. Binds every node, resolving credentials and platform strategies
  async fn bind(&self, graph: GraphDef) -> Result<Pipeline, BindError>;
}

/// Standard binder backed by a credential directory and a platform registry.
pub struct StandardBinder<D: CredentialDirectory> {
  directory: D,
  platforms: Arc<PlatformRegistry>,
}

impl<D: CredentialDirectory> StandardBinder<D> {
  /// Create a binder with an explicit platform registry.
  pub fn new(directory: D, platforms: Arc<PlatformRegistry>) -> Self {
    Self {
      directory,
      platforms,
    }
  }

  /// Create a binder that uses the process-wide platform registry.
  pub fn with_global_platforms(directory: D) -> Self {
    Self::new(directory, PlatformRegistry::global())
  }

  pub fn directory(&self) -> &D {
    &self.directory
  }

  /// Pick the node whose output is the result.
  fn select_terminal(graph: &Graph, designated: Option<&str>) -> Result<String, BindError> {
    if let Some(terminal) = designated {
      return Ok(terminal.to_string());
    }

    let mut sinks = graph.sinks();
    if sinks.len() == 1 {
      return Ok(sinks.remove(0));
    }
    Err(BindError::AmbiguousTerminal { sinks })
  }

  /// Resolve the invoker for a model node.
  ///
  /// `bound` caches invokers by credential id for the duration of one bind,
  /// so nodes sharing a credential share an invoker and the directory is
  /// asked once per credential.
  async fn bind_model(
    &self,
    node_id: &str,
    config: &LlmConfig,
    bound: &mut HashMap<i64, (Credential, Arc<dyn ModelInvoker>)>,
  ) -> Result<ModelBinding, BindError> {
    if let Some((credential, invoker)) = bound.get(&config.credential_id) {
      return Ok(ModelBinding {
        credential_id: credential.id,
        platform: credential.platform.clone(),
        config: config.clone(),
        invoker: invoker.clone(),
      });
    }

    let credential = self
      .directory
      .lookup(config.credential_id)
      .await?
      .ok_or_else(|| BindError::UnresolvedCredential {
        node_id: node_id.to_string(),
        credential_id: config.credential_id,
      })?;

    let strategy =
      self
        .platforms
        .get(&credential.platform)
        .ok_or_else(|| BindError::UnsupportedPlatform {
          node_id: node_id.to_string(),
          platform: credential.platform.clone(),
        })?;

    let invoker = strategy
      .bind(&credential)
      .map_err(|source| BindError::PlatformBinding {
        node_id: node_id.to_string(),
        source,
      })?;

    debug!(
      node_id = %node_id,
      credential_id = credential.id,
      platform = %credential.platform,
      "bound model node"
    );

    let binding = ModelBinding {
      credential_id: credential.id,
      platform: credential.platform.clone(),
      config: config.clone(),
      invoker: invoker.clone(),
    };
    bound.insert(credential.id, (credential, invoker));
    Ok(binding)
  }

  /// Bind a single node whose data has been decoded into `kind`.
  async fn bind_node(
    &self,
    node: NodeDef,
    kind: NodeKind,
    bound: &mut HashMap<i64, (Credential, Arc<dyn ModelInvoker>)>,
  ) -> Result<CompiledNode, BindError> {
    let behavior = match kind {
      NodeKind::Llm(config) => {
        Behavior::Model(self.bind_model(&node.node_id, &config, bound).await?)
      }
      NodeKind::Internal(config) => Behavior::Internal(config),
      NodeKind::Unknown { type_name } => {
        return Err(BindError::UnknownNodeType {
          node_id: node.node_id,
          type_name,
        });
      }
    };

    Ok(CompiledNode {
      node_id: node.node_id,
      output: node.output,
      timeout_ms: node.timeout_ms,
      behavior,
    })
  }
}

#[async_trait]
impl<D: CredentialDirectory> Binder for StandardBinder<D> {
  #[instrument(name = "bind", skip(self, def), fields(nodes = def.nodes.len()))]
  async fn bind(&self, def: GraphDef) -> Result<Pipeline, BindError> {
    let edges: Vec<(String, String)> = def
      .edges
      .iter()
      .map(|e| (e.from.clone(), e.to.clone()))
      .collect();
    let graph = Graph::new(def.node_ids(), &edges);

    let levels = graph.levels().map_err(|e| match e {
      WorkflowError::Cycle { nodes } => {
        warn!(nodes = ?nodes, "cycle detected");
        BindError::CyclicGraph { nodes }
      }
      other => BindError::Workflow(other),
    })?;

    let terminal = Self::select_terminal(&graph, def.terminal.as_deref())?;

    // Every node's data is checked before any credential is looked up.
    let kinds = def
      .nodes
      .iter()
      .map(|node| node.decode(|name| def.declares_output(name)))
      .collect::<Result<Vec<_>, _>>()
      .inspect_err(|e| warn!(node_id = %e.node_id, error = %e.message, "invalid node data"))?;

    // Everything is bound into a local map first; nothing escapes unless
    // every node succeeds.
    let mut bound = HashMap::new();
    let mut compiled: HashMap<String, CompiledNode> = HashMap::with_capacity(def.nodes.len());
    for (node, kind) in def.nodes.into_iter().zip(kinds) {
      let node = self.bind_node(node, kind, &mut bound).await?;
      compiled.insert(node.node_id.clone(), node);
    }

    let levels = levels
      .into_iter()
      .map(|level| {
        level
          .into_iter()
          .map(|id| {
            compiled
              .remove(&id)
              .ok_or_else(|| BindError::Workflow(WorkflowError::NodeNotFound(id)))
          })
          .collect::<Result<Vec<_>, _>>()
      })
      .collect::<Result<Vec<_>, _>>()?;

    let pipeline = Pipeline::from_levels(levels, graph, &terminal)?;

    info!(
      nodes = pipeline.len(),
      terminal = %terminal,
      order = ?pipeline.order(),
      "pipeline compiled"
    );

    Ok(pipeline)
  }
}
