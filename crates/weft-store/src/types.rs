use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Store-assigned definition identifier.
pub type DefinitionId = i64;

/// Whether a definition may be run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DefinitionStatus {
  #[default]
  Enabled,
  Disabled,
}

/// A workflow definition as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowDefinition {
  pub id: DefinitionId,
  pub name: String,
  /// Globally unique when present. Blank keys are stored as absent.
  pub definition_key: Option<String>,
  /// Serialized node/edge document. Empty until a graph is saved.
  pub graph_text: String,
  pub remark: Option<String>,
  pub status: DefinitionStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The editable fields of a definition, for create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDefinition {
  pub name: String,
  #[serde(default)]
  pub definition_key: Option<String>,
  #[serde(default)]
  pub graph_text: String,
  #[serde(default)]
  pub remark: Option<String>,
  #[serde(default)]
  pub status: DefinitionStatus,
}

impl NewDefinition {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  /// The key with blank values treated as absent.
  pub fn normalized_key(&self) -> Option<&str> {
    self
      .definition_key
      .as_deref()
      .map(str::trim)
      .filter(|k| !k.is_empty())
  }
}

/// Filter for listing definitions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionFilter {
  /// Substring of the name.
  pub name: Option<String>,
  /// Exact definition key.
  pub definition_key: Option<String>,
  pub status: Option<DefinitionStatus>,
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub page: u32,
  pub page_size: u32,
}

impl PageRequest {
  pub fn new(page: u32, page_size: u32) -> Self {
    Self {
      page: page.max(1),
      page_size: page_size.max(1),
    }
  }

  pub(crate) fn offset(&self) -> i64 {
    i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self::new(1, 20)
  }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: i64,
}
