use std::collections::{HashMap, HashSet};

use crate::error::WorkflowError;

/// Graph structure for traversal and ordering.
///
/// Node ids are kept in declaration order; every ordering the graph hands
/// out breaks ties by that order, so the same document always yields the
/// same schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
  /// Node ids in declaration order.
  nodes: Vec<String>,
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from node ids and edges. Duplicate edges are ignored.
  ///
  /// Edges are expected to reference known nodes; the parser guarantees it.
  pub fn new(nodes: Vec<String>, edges: &[(String, String)]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    // Initialize all nodes
    for node_id in &nodes {
      adjacency.entry(node_id.clone()).or_default();
      reverse_adjacency.entry(node_id.clone()).or_default();
    }

    let mut seen = HashSet::new();
    for (from, to) in edges {
      if !seen.insert((from, to)) {
        continue;
      }
      adjacency.entry(from.clone()).or_default().push(to.clone());
      reverse_adjacency
        .entry(to.clone())
        .or_default()
        .push(from.clone());
    }

    Self {
      nodes,
      adjacency,
      reverse_adjacency,
    }
  }

  /// Node ids in declaration order.
  pub fn nodes(&self) -> &[String] {
    &self.nodes
  }

  /// Nodes with no incoming edges, in declaration order.
  pub fn entry_points(&self) -> Vec<String> {
    self
      .nodes
      .iter()
      .filter(|id| self.upstream(id).is_empty())
      .cloned()
      .collect()
  }

  /// Nodes with no outgoing edges, in declaration order.
  pub fn sinks(&self) -> Vec<String> {
    self
      .nodes
      .iter()
      .filter(|id| self.downstream(id).is_empty())
      .cloned()
      .collect()
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Group nodes into topological levels.
  ///
  /// Level 0 holds every node without upstream producers; each following
  /// level holds the nodes whose producers all sit in earlier levels. Nodes
  /// inside a level are in declaration order. Flattening the levels gives a
  /// topological order.
  ///
  /// Fails with [`WorkflowError::Cycle`] naming every node that could not
  /// be placed.
  pub fn levels(&self) -> Result<Vec<Vec<String>>, WorkflowError> {
    let position: HashMap<&str, usize> = self
      .nodes
      .iter()
      .enumerate()
      .map(|(i, id)| (id.as_str(), i))
      .collect();

    let mut in_degree: HashMap<&str, usize> = self
      .nodes
      .iter()
      .map(|id| (id.as_str(), self.upstream(id).len()))
      .collect();

    let mut current: Vec<&str> = self
      .nodes
      .iter()
      .map(String::as_str)
      .filter(|id| in_degree[id] == 0)
      .collect();

    let mut levels = Vec::new();
    let mut placed = 0;

    while !current.is_empty() {
      placed += current.len();

      let mut next = Vec::new();
      for node_id in &current {
        for downstream in self.downstream(node_id) {
          if let Some(degree) = in_degree.get_mut(downstream.as_str()) {
            *degree -= 1;
            if *degree == 0 {
              next.push(downstream.as_str());
            }
          }
        }
      }
      next.sort_by_key(|id| position[id]);

      levels.push(current.iter().map(|id| id.to_string()).collect());
      current = next;
    }

    if placed < self.nodes.len() {
      let nodes = self
        .nodes
        .iter()
        .filter(|id| in_degree[id.as_str()] > 0)
        .cloned()
        .collect();
      return Err(WorkflowError::Cycle { nodes });
    }

    Ok(levels)
  }
}
