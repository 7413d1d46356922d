use std::ops::Range;

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::CompiledNode;

/// A compiled workflow ready for execution.
///
/// Nodes are stored in topological order and grouped into levels; every node
/// in a level depends only on nodes in earlier levels. A pipeline is never
/// mutated after construction, so one instance can back any number of
/// concurrent executions.
#[derive(Debug, Clone)]
pub struct Pipeline {
  nodes: Vec<CompiledNode>,
  levels: Vec<Range<usize>>,
  graph: Graph,
  terminal: usize,
}

impl Pipeline {
  /// Assemble a pipeline from bound nodes grouped by level.
  pub fn from_levels(
    levels: Vec<Vec<CompiledNode>>,
    graph: Graph,
    terminal: &str,
  ) -> Result<Self, WorkflowError> {
    let mut nodes = Vec::new();
    let mut ranges = Vec::with_capacity(levels.len());
    for level in levels {
      let start = nodes.len();
      nodes.extend(level);
      ranges.push(start..nodes.len());
    }

    let terminal = nodes
      .iter()
      .position(|n| n.node_id == terminal)
      .ok_or_else(|| WorkflowError::NodeNotFound(terminal.to_string()))?;

    Ok(Self {
      nodes,
      levels: ranges,
      graph,
      terminal,
    })
  }

  /// Nodes in topological order.
  pub fn nodes(&self) -> &[CompiledNode] {
    &self.nodes
  }

  /// Node ids in topological order.
  pub fn order(&self) -> Vec<&str> {
    self.nodes.iter().map(|n| n.node_id.as_str()).collect()
  }

  /// Levels of mutually independent nodes, in execution order.
  pub fn levels(&self) -> impl Iterator<Item = &[CompiledNode]> {
    self.levels.iter().map(|range| &self.nodes[range.clone()])
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&CompiledNode> {
    self.nodes.iter().find(|n| n.node_id == node_id)
  }

  /// The node whose output is the execution result.
  pub fn terminal(&self) -> &CompiledNode {
    &self.nodes[self.terminal]
  }

  /// The graph structure, for traversal.
  pub fn graph(&self) -> &Graph {
    &self.graph
  }
}
