//! Weft Store
//!
//! This crate provides the storage trait and a SQLite implementation for
//! workflow definitions and platform credentials.
//!
//! The [`DefinitionStore`] trait defines operations for:
//! - Creating, updating and deleting workflow definitions
//! - Looking definitions up by id or by definition key
//! - Paging through definitions with a filter
//!
//! [`SqliteStore`] also serves as the credential directory consulted when
//! binding pipelines.

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::{
  DefinitionFilter, DefinitionId, DefinitionStatus, NewDefinition, Page, PageRequest,
  WorkflowDefinition,
};

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// Another definition already holds this definition key.
  #[error("definition key already in use: {0}")]
  DuplicateKey(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// Schema migration failed.
  #[error("migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Storage trait for workflow definitions.
///
/// The store treats `graph_text` as opaque; it never parses it.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
  /// Create a definition and return its assigned id.
  async fn create(&self, definition: &NewDefinition) -> Result<DefinitionId, StoreError>;

  /// Replace every editable field of a definition.
  async fn update(&self, id: DefinitionId, definition: &NewDefinition) -> Result<(), StoreError>;

  /// Replace only the graph text of a definition.
  async fn update_graph(&self, id: DefinitionId, graph_text: &str) -> Result<(), StoreError>;

  /// Delete a definition.
  async fn delete(&self, id: DefinitionId) -> Result<(), StoreError>;

  /// Get a definition by id.
  async fn get(&self, id: DefinitionId) -> Result<Option<WorkflowDefinition>, StoreError>;

  /// Get a definition by its definition key.
  async fn get_by_key(&self, key: &str) -> Result<Option<WorkflowDefinition>, StoreError>;

  /// List one page of definitions matching `filter`, newest first.
  async fn list_page(
    &self,
    filter: &DefinitionFilter,
    page: PageRequest,
  ) -> Result<Page<WorkflowDefinition>, StoreError>;
}
