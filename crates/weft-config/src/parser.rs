//! Graph document parser.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::edge::Edge;
use crate::error::ParseError;
use crate::graph::GraphDef;
use crate::node::NodeDef;

#[derive(Debug, Deserialize)]
struct RawDocument {
  nodes: Vec<RawNode>,
  #[serde(default)]
  edges: Vec<Edge>,
  #[serde(default)]
  terminal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
  id: String,
  #[serde(rename = "type", default)]
  node_type: Option<String>,
  #[serde(default)]
  data: serde_json::Value,
  #[serde(default)]
  output: Option<String>,
  #[serde(default, alias = "timeoutMs")]
  timeout_ms: Option<u64>,
}

/// Parse graph text into a graph definition.
///
/// Pure transformation: validates document structure and resolves explicit
/// and implicit edges. Node data is only read far enough to find the
/// variables it references; typed decoding and cycle detection happen when
/// binding.
pub fn parse(graph_text: &str) -> Result<GraphDef, ParseError> {
  if graph_text.trim().is_empty() {
    return Err(ParseError::Empty);
  }

  let document: RawDocument = serde_json::from_str(graph_text).map_err(|e| {
    let msg = e.to_string();
    let message = match extract_missing_field(&msg) {
      Some(field) => format!("missing required field: {}", field),
      None => msg,
    };
    ParseError::Malformed { message }
  })?;

  if document.nodes.is_empty() {
    return Err(ParseError::NoNodes);
  }

  // Node ids and output names must be unique before references are read,
  // since operand classification depends on the full set of outputs.
  let mut node_ids: HashSet<&str> = HashSet::new();
  let mut outputs: HashMap<String, String> = HashMap::new();
  for raw in &document.nodes {
    if raw.id.trim().is_empty() {
      return Err(ParseError::Malformed {
        message: "node id must not be blank".to_string(),
      });
    }
    if !node_ids.insert(raw.id.as_str()) {
      return Err(ParseError::DuplicateNode {
        node_id: raw.id.clone(),
      });
    }
    let output = output_name(raw);
    if let Some(first) = outputs.get(&output) {
      return Err(ParseError::DuplicateOutput {
        output,
        first: first.clone(),
        second: raw.id.clone(),
      });
    }
    outputs.insert(output, raw.id.clone());
  }

  let mut edges = Vec::new();
  let mut seen: HashSet<Edge> = HashSet::new();

  for edge in document.edges {
    for end in [&edge.from, &edge.to] {
      if !node_ids.contains(end.as_str()) {
        return Err(ParseError::UnknownNode {
          node_id: end.clone(),
        });
      }
    }
    if seen.insert(edge.clone()) {
      edges.push(edge);
    }
  }

  if let Some(terminal) = &document.terminal {
    if !node_ids.contains(terminal.as_str()) {
      return Err(ParseError::UnknownNode {
        node_id: terminal.clone(),
      });
    }
  }

  let mut nodes = Vec::with_capacity(document.nodes.len());
  for raw in document.nodes {
    let output = output_name(&raw);
    let node_type = match raw.node_type.as_deref().map(str::trim) {
      Some(t) if !t.is_empty() => t.to_string(),
      _ => return Err(ParseError::MissingType { node_id: raw.id }),
    };
    let data = if raw.data.is_null() {
      serde_json::Value::Object(Default::default())
    } else {
      raw.data
    };

    let node = NodeDef {
      node_id: raw.id,
      output,
      node_type,
      data,
      timeout_ms: raw.timeout_ms,
    };

    // Implicit edges: every variable this node reads that another node writes.
    for name in node.references(|name| outputs.contains_key(name)) {
      if let Some(producer) = outputs.get(&name) {
        let edge = Edge::new(producer.clone(), node.node_id.clone());
        if seen.insert(edge.clone()) {
          edges.push(edge);
        }
      }
    }

    nodes.push(node);
  }

  Ok(GraphDef {
    nodes,
    edges,
    terminal: document.terminal,
  })
}

fn output_name(raw: &RawNode) -> String {
  match raw.output.as_deref().map(str::trim) {
    Some(o) if !o.is_empty() => o.to_string(),
    _ => raw.id.clone(),
  }
}

fn extract_missing_field(error_message: &str) -> Option<&str> {
  let marker = "missing field `";
  let start = error_message.find(marker)? + marker.len();
  let rest = &error_message[start..];
  let end = rest.find('`')?;
  Some(&rest[..end])
}
