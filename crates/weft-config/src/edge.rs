use serde::{Deserialize, Serialize};

/// A data-flow connection between two nodes.
///
/// Accepts `source`/`target` as aliases for `from`/`to` so documents produced
/// by flow editors load without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
  #[serde(alias = "source")]
  pub from: String,
  #[serde(alias = "target")]
  pub to: String,
}

impl Edge {
  pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
    Self {
      from: from.into(),
      to: to.into(),
    }
  }
}
