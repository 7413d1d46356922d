use crate::edge::Edge;
use crate::node::NodeDef;

/// A parsed, typed workflow graph.
///
/// Nodes keep their declaration order. `edges` holds both the explicit edges
/// from the document and the implicit ones discovered from variable
/// references, without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDef {
  pub nodes: Vec<NodeDef>,
  pub edges: Vec<Edge>,
  /// Node whose output is the workflow result, when the document names one.
  pub terminal: Option<String>,
}

impl GraphDef {
  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.node_id == node_id)
  }

  /// Whether some node writes the variable `name`.
  pub fn declares_output(&self, name: &str) -> bool {
    self.nodes.iter().any(|n| n.output == name)
  }

  /// Node ids in declaration order.
  pub fn node_ids(&self) -> Vec<String> {
    self.nodes.iter().map(|n| n.node_id.clone()).collect()
  }
}
