use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use weft_credential::{Credential, CredentialDirectory, CredentialId, DirectoryError};

use crate::{
  DefinitionFilter, DefinitionId, DefinitionStore, NewDefinition, Page, PageRequest, StoreError,
  WorkflowDefinition,
};

const DEFINITION_COLUMNS: &str =
  "id, name, definition_key, graph_text, remark, status, created_at, updated_at";

/// SQLite-based store implementation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await?;
    Ok(())
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  /// Insert or replace a credential.
  pub async fn upsert_credential(&self, credential: &Credential) -> Result<(), StoreError> {
    sqlx::query(
      r#"
            INSERT INTO credentials (id, name, platform, api_key, base_url)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                platform = excluded.platform,
                api_key = excluded.api_key,
                base_url = excluded.base_url
            "#,
    )
    .bind(credential.id)
    .bind(&credential.name)
    .bind(&credential.platform)
    .bind(&credential.api_key)
    .bind(&credential.base_url)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  /// Get a credential by id.
  pub async fn get_credential(&self, id: CredentialId) -> Result<Option<Credential>, StoreError> {
    let row = sqlx::query(
      r#"
            SELECT id, name, platform, api_key, base_url
            FROM credentials
            WHERE id = ?
            "#,
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(|r| credential_from_row(&r)).transpose()?)
  }

  /// List every credential, ordered by id.
  pub async fn list_credentials(&self) -> Result<Vec<Credential>, StoreError> {
    let rows = sqlx::query(
      r#"
            SELECT id, name, platform, api_key, base_url
            FROM credentials
            ORDER BY id ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .iter()
        .map(credential_from_row)
        .collect::<Result<Vec<_>, _>>()?,
    )
  }

  /// Delete a credential. Deleting an unknown id is not an error.
  pub async fn delete_credential(&self, id: CredentialId) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM credentials WHERE id = ?")
      .bind(id)
      .execute(&self.pool)
      .await?;

    Ok(())
  }
}

fn credential_from_row(row: &SqliteRow) -> Result<Credential, sqlx::Error> {
  Ok(Credential {
    id: row.try_get("id")?,
    name: row.try_get("name")?,
    platform: row.try_get("platform")?,
    api_key: row.try_get("api_key")?,
    base_url: row.try_get("base_url")?,
  })
}

/// A write that trips the unique key index lost a race for the key.
fn key_conflict(error: sqlx::Error, definition: &NewDefinition) -> StoreError {
  match (&error, definition.normalized_key()) {
    (sqlx::Error::Database(db), Some(key)) if db.is_unique_violation() => {
      StoreError::DuplicateKey(key.to_string())
    }
    _ => StoreError::Database(error),
  }
}

fn not_found(id: DefinitionId) -> StoreError {
  StoreError::NotFound(format!("workflow definition {}", id))
}

#[async_trait]
impl DefinitionStore for SqliteStore {
  async fn create(&self, definition: &NewDefinition) -> Result<DefinitionId, StoreError> {
    let now = Utc::now();
    let result = sqlx::query(
      r#"
            INSERT INTO workflow_definitions (name, definition_key, graph_text, remark, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(&definition.name)
    .bind(definition.normalized_key())
    .bind(&definition.graph_text)
    .bind(&definition.remark)
    .bind(definition.status)
    .bind(now)
    .bind(now)
    .execute(&self.pool)
    .await
    .map_err(|e| key_conflict(e, definition))?;

    Ok(result.last_insert_rowid())
  }

  async fn update(&self, id: DefinitionId, definition: &NewDefinition) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_definitions
            SET name = ?, definition_key = ?, graph_text = ?, remark = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
    )
    .bind(&definition.name)
    .bind(definition.normalized_key())
    .bind(&definition.graph_text)
    .bind(&definition.remark)
    .bind(definition.status)
    .bind(Utc::now())
    .bind(id)
    .execute(&self.pool)
    .await
    .map_err(|e| key_conflict(e, definition))?;

    if result.rows_affected() == 0 {
      return Err(not_found(id));
    }
    Ok(())
  }

  async fn update_graph(&self, id: DefinitionId, graph_text: &str) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_definitions
            SET graph_text = ?, updated_at = ?
            WHERE id = ?
            "#,
    )
    .bind(graph_text)
    .bind(Utc::now())
    .bind(id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(not_found(id));
    }
    Ok(())
  }

  async fn delete(&self, id: DefinitionId) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM workflow_definitions WHERE id = ?")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(not_found(id));
    }
    Ok(())
  }

  async fn get(&self, id: DefinitionId) -> Result<Option<WorkflowDefinition>, StoreError> {
    let sql = format!(
      "SELECT {} FROM workflow_definitions WHERE id = ?",
      DEFINITION_COLUMNS
    );
    Ok(
      sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn get_by_key(&self, key: &str) -> Result<Option<WorkflowDefinition>, StoreError> {
    let sql = format!(
      "SELECT {} FROM workflow_definitions WHERE definition_key = ?",
      DEFINITION_COLUMNS
    );
    Ok(
      sqlx::query_as(&sql)
        .bind(key.trim())
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn list_page(
    &self,
    filter: &DefinitionFilter,
    page: PageRequest,
  ) -> Result<Page<WorkflowDefinition>, StoreError> {
    const WHERE: &str = r#"
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR definition_key = ?2)
              AND (?3 IS NULL OR status = ?3)
            "#;

    let total: i64 = sqlx::query_scalar(&format!(
      "SELECT COUNT(*) FROM workflow_definitions {}",
      WHERE
    ))
    .bind(&filter.name)
    .bind(&filter.definition_key)
    .bind(filter.status)
    .fetch_one(&self.pool)
    .await?;

    let items = sqlx::query_as(&format!(
      "SELECT {} FROM workflow_definitions {} ORDER BY id DESC LIMIT ?4 OFFSET ?5",
      DEFINITION_COLUMNS, WHERE
    ))
    .bind(&filter.name)
    .bind(&filter.definition_key)
    .bind(filter.status)
    .bind(i64::from(page.page_size))
    .bind(page.offset())
    .fetch_all(&self.pool)
    .await?;

    Ok(Page { items, total })
  }
}

#[async_trait]
impl CredentialDirectory for SqliteStore {
  async fn lookup(&self, id: CredentialId) -> Result<Option<Credential>, DirectoryError> {
    self
      .get_credential(id)
      .await
      .map_err(|e| DirectoryError::unavailable(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::DefinitionStatus;
  use sqlx::sqlite::SqlitePoolOptions;

  async fn store() -> SqliteStore {
    // One connection, so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .unwrap();
    let store = SqliteStore::new(pool);
    store.migrate().await.unwrap();
    store
  }

  fn definition(name: &str, key: Option<&str>) -> NewDefinition {
    NewDefinition {
      name: name.to_string(),
      definition_key: key.map(str::to_string),
      graph_text: String::new(),
      remark: None,
      status: DefinitionStatus::Enabled,
    }
  }

  #[tokio::test]
  async fn test_create_and_get() {
    let store = store().await;
    let id = store
      .create(&definition("greeter", Some("greet")))
      .await
      .unwrap();

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.name, "greeter");
    assert_eq!(stored.definition_key.as_deref(), Some("greet"));
    assert_eq!(stored.graph_text, "");
    assert_eq!(stored.status, DefinitionStatus::Enabled);

    let by_key = store.get_by_key("greet").await.unwrap().unwrap();
    assert_eq!(by_key.id, id);
    assert!(store.get(id + 100).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_duplicate_key_is_reported() {
    let store = store().await;
    store.create(&definition("a", Some("daily"))).await.unwrap();
    let b = store.create(&definition("b", Some("weekly"))).await.unwrap();

    assert!(matches!(
      store.create(&definition("c", Some(" daily "))).await,
      Err(StoreError::DuplicateKey(ref key)) if key == "daily"
    ));
    assert!(matches!(
      store.update(b, &definition("b", Some("daily"))).await,
      Err(StoreError::DuplicateKey(_))
    ));
  }

  #[tokio::test]
  async fn test_blank_keys_are_stored_as_absent() {
    let store = store().await;
    let a = store.create(&definition("a", Some("  "))).await.unwrap();
    let b = store.create(&definition("b", None)).await.unwrap();

    assert_eq!(store.get(a).await.unwrap().unwrap().definition_key, None);
    assert_eq!(store.get(b).await.unwrap().unwrap().definition_key, None);
  }

  #[tokio::test]
  async fn test_update_graph_and_missing_rows() {
    let store = store().await;
    let id = store.create(&definition("flow", None)).await.unwrap();

    store.update_graph(id, "{\"nodes\":[]}").await.unwrap();
    assert_eq!(
      store.get(id).await.unwrap().unwrap().graph_text,
      "{\"nodes\":[]}"
    );

    assert!(matches!(
      store.update_graph(999, "{}").await,
      Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
      store.update(999, &definition("x", None)).await,
      Err(StoreError::NotFound(_))
    ));

    store.delete(id).await.unwrap();
    assert!(matches!(store.delete(id).await, Err(StoreError::NotFound(_))));
  }

  #[tokio::test]
  async fn test_list_page_filters_and_pages() {
    let store = store().await;
    for i in 0..5 {
      store
        .create(&definition(&format!("report-{}", i), Some(&format!("k{}", i))))
        .await
        .unwrap();
    }
    let mut disabled = definition("other", None);
    disabled.status = DefinitionStatus::Disabled;
    store.create(&disabled).await.unwrap();

    let all = store
      .list_page(&DefinitionFilter::default(), PageRequest::new(1, 4))
      .await
      .unwrap();
    assert_eq!(all.total, 6);
    assert_eq!(all.items.len(), 4);
    assert_eq!(all.items[0].name, "other");

    let second = store
      .list_page(&DefinitionFilter::default(), PageRequest::new(2, 4))
      .await
      .unwrap();
    assert_eq!(second.items.len(), 2);

    let reports = store
      .list_page(
        &DefinitionFilter {
          name: Some("report".to_string()),
          ..Default::default()
        },
        PageRequest::default(),
      )
      .await
      .unwrap();
    assert_eq!(reports.total, 5);

    let by_status = store
      .list_page(
        &DefinitionFilter {
          status: Some(DefinitionStatus::Disabled),
          ..Default::default()
        },
        PageRequest::default(),
      )
      .await
      .unwrap();
    assert_eq!(by_status.total, 1);

    let by_key = store
      .list_page(
        &DefinitionFilter {
          definition_key: Some("k3".to_string()),
          ..Default::default()
        },
        PageRequest::default(),
      )
      .await
      .unwrap();
    assert_eq!(by_key.items[0].name, "report-3");
  }

  #[tokio::test]
  async fn test_credentials_serve_as_directory() {
    let store = store().await;
    let credential = Credential {
      id: 7,
      name: "local".to_string(),
      platform: "Ollama".to_string(),
      api_key: "none".to_string(),
      base_url: Some("http://localhost:11434".to_string()),
    };
    store.upsert_credential(&credential).await.unwrap();

    assert_eq!(store.lookup(7).await.unwrap(), Some(credential.clone()));
    assert_eq!(store.lookup(8).await.unwrap(), None);

    let mut rotated = credential;
    rotated.api_key = "rotated".to_string();
    store.upsert_credential(&rotated).await.unwrap();
    assert_eq!(store.list_credentials().await.unwrap(), vec![rotated]);

    store.delete_credential(7).await.unwrap();
    assert_eq!(store.lookup(7).await.unwrap(), None);
  }
}
