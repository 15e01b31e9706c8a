//! In-memory `StoreClient` implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use entityrepo_core::cache::default_cache_key;
use entityrepo_core::repository::{DEFAULT_MAX_BATCH_GET, DEFAULT_MAX_BATCH_WRITE};
use entityrepo_core::storage::{
    project_key, Item, Key, Page, QueryParams, ScanParams, StoreClient, StoreError, StoreResult,
    UpdateExpression, WriteCondition, WriteRequest,
};

use super::expression::Condition;

/// One table: its key schema and items ordered by rendered key.
#[derive(Debug, Clone)]
struct Table {
    key_fields: Vec<String>,
    items: BTreeMap<String, Item>,
}

impl Table {
    fn new(key_fields: &[&str]) -> Self {
        Self {
            key_fields: key_fields.iter().map(|f| f.to_string()).collect(),
            items: BTreeMap::new(),
        }
    }

    /// Renders the storage key of `key`, which must name every key field.
    fn storage_key(&self, key: &Key) -> StoreResult<String> {
        let fields: Vec<&str> = self.key_fields.iter().map(String::as_str).collect();
        let projected = project_key(key, &fields);
        if projected.len() != fields.len() {
            return Err(StoreError::InvalidRequest(format!(
                "key must contain {}",
                self.key_fields.join(", ")
            )));
        }
        Ok(default_cache_key(&projected))
    }

    fn key_of(&self, item: &Item) -> Key {
        let fields: Vec<&str> = self.key_fields.iter().map(String::as_str).collect();
        project_key(item, &fields)
    }

    /// Items matching `condition` in key order, after `exclusive_start_key`,
    /// cut to `limit`.
    fn select(
        &self,
        condition: &Condition,
        forward: bool,
        exclusive_start_key: Option<&Key>,
        limit: Option<u32>,
    ) -> StoreResult<Page<Item>> {
        let start = exclusive_start_key
            .map(|key| self.storage_key(key))
            .transpose()?;

        let mut matched: Vec<(&String, &Item)> = self
            .items
            .iter()
            .filter(|(_, item)| condition.matches(item))
            .collect();
        if !forward {
            matched.reverse();
        }
        if let Some(start) = start {
            matched.retain(|(key, _)| {
                if forward {
                    key.as_str() > start.as_str()
                } else {
                    key.as_str() < start.as_str()
                }
            });
        }

        let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let has_more = matched.len() > limit;
        let items: Vec<Item> = matched
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect();
        let last_evaluated_key = if has_more {
            items.last().map(|item| self.key_of(item))
        } else {
            None
        };

        Ok(Page::new(items, last_evaluated_key))
    }
}

/// In-memory store backend for testing and local development.
///
/// Tables are registered up front with their key fields. Data lives in
/// `Arc<RwLock<_>>` and is lost when the last clone is dropped. Query and
/// scan understand a small expression subset (`=`, `begins_with`, `AND`);
/// index names are accepted and ignored.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl InMemoryStore {
    /// Creates a store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given `(table, key_fields)` pairs registered.
    pub fn with_tables<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        let tables = tables
            .into_iter()
            .map(|(name, key_fields)| (name.to_string(), Table::new(key_fields)))
            .collect();
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Registers a table keyed by `key_fields` on a live store.
    pub async fn create_table(&self, name: &str, key_fields: &[&str]) {
        self.tables
            .write()
            .await
            .insert(name.to_string(), Table::new(key_fields));
        tracing::debug!(table = name, ?key_fields, "Table created");
    }

    /// Number of items in `table`, or `None` if no such table exists.
    pub async fn len(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(|t| t.items.len())
    }
}

fn missing_table(table: &str) -> StoreError {
    StoreError::ResourceNotFound(format!("table {table} does not exist"))
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn get_item(&self, table: &str, key: &Key) -> StoreResult<Option<Item>> {
        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        let storage_key = table.storage_key(key)?;
        Ok(table.items.get(&storage_key).cloned())
    }

    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&WriteCondition>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let storage_key = table.storage_key(&item)?;

        if let Some(WriteCondition::ItemNotExists { .. }) = condition {
            if table.items.contains_key(&storage_key) {
                return Err(StoreError::ConditionalCheckFailed(
                    "The conditional request failed".to_string(),
                ));
            }
        }

        table.items.insert(storage_key, item);
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &Key,
        update: &UpdateExpression,
    ) -> StoreResult<Option<Item>> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let storage_key = table.storage_key(key)?;

        if let Some((field, _)) = update
            .assignments()
            .find(|(field, _)| table.key_fields.iter().any(|k| k == field))
        {
            return Err(StoreError::InvalidRequest(format!(
                "cannot update key attribute {field}"
            )));
        }

        let key_item = table.key_of(key);
        let item = table.items.entry(storage_key).or_insert(key_item);
        for (field, value) in update.assignments() {
            item.insert(field.to_string(), value.clone());
        }
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, table: &str, key: &Key) -> StoreResult<Option<Item>> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let storage_key = table.storage_key(key)?;
        Ok(table.items.remove(&storage_key))
    }

    async fn batch_get_item(&self, table: &str, keys: &[Key]) -> StoreResult<Vec<Item>> {
        if keys.len() > DEFAULT_MAX_BATCH_GET {
            return Err(StoreError::InvalidRequest(format!(
                "too many keys in batch get: {} > {DEFAULT_MAX_BATCH_GET}",
                keys.len()
            )));
        }

        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(item) = table.items.get(&table.storage_key(key)?) {
                items.push(item.clone());
            }
        }
        Ok(items)
    }

    async fn batch_write_item(&self, table: &str, requests: &[WriteRequest]) -> StoreResult<()> {
        if requests.len() > DEFAULT_MAX_BATCH_WRITE {
            return Err(StoreError::InvalidRequest(format!(
                "too many requests in batch write: {} > {DEFAULT_MAX_BATCH_WRITE}",
                requests.len()
            )));
        }

        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        // Resolve every key first so a bad request leaves the table untouched
        let resolved = requests
            .iter()
            .map(|request| match request {
                WriteRequest::Put(item) => table.storage_key(item),
                WriteRequest::Delete(key) => table.storage_key(key),
            })
            .collect::<StoreResult<Vec<_>>>()?;

        for (request, storage_key) in requests.iter().zip(resolved) {
            match request {
                WriteRequest::Put(item) => {
                    table.items.insert(storage_key, item.clone());
                }
                WriteRequest::Delete(_) => {
                    table.items.remove(&storage_key);
                }
            }
        }
        Ok(())
    }

    async fn query(&self, table: &str, params: &QueryParams) -> StoreResult<Page<Item>> {
        let names = &params.expression_attribute_names;
        let values = &params.expression_attribute_values;
        let key_condition = Condition::parse(&params.key_condition_expression, names, values)?;
        let filter = Condition::parse_optional(params.filter_expression.as_deref(), names, values)?;

        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        let both = key_condition.and(filter);
        table.select(
            &both,
            params.scan_index_forward.unwrap_or(true),
            params.exclusive_start_key.as_ref(),
            params.limit,
        )
    }

    async fn scan(&self, table: &str, params: Option<&ScanParams>) -> StoreResult<Page<Item>> {
        let default_params = ScanParams::default();
        let params = params.unwrap_or(&default_params);
        let filter = Condition::parse_optional(
            params.filter_expression.as_deref(),
            &params.expression_attribute_names,
            &params.expression_attribute_values,
        )?;

        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        table.select(
            &filter,
            true,
            params.exclusive_start_key.as_ref(),
            params.limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityrepo_core::storage::{build_update_expression, key_of, PartialUpdate};
    use serde_json::json;

    fn store() -> InMemoryStore {
        InMemoryStore::with_tables([
            ("sites", &["siteId"][..]),
            ("artifacts", &["siteId", "artifactId"][..]),
        ])
    }

    fn artifact(site: &str, id: &str) -> Item {
        key_of([("siteId", site), ("artifactId", id), ("name", "Artifact")])
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = store();
        let item = key_of([("siteId", "louvre"), ("name", "Louvre")]);

        store.put_item("sites", item.clone(), None).await.unwrap();

        let fetched = store
            .get_item("sites", &key_of([("siteId", "louvre")]))
            .await
            .unwrap();
        assert_eq!(fetched, Some(item));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = store();
        let fetched = store
            .get_item("sites", &key_of([("siteId", "nowhere")]))
            .await
            .unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_unknown_table_is_resource_not_found() {
        let store = store();
        let err = store
            .get_item("museums", &key_of([("siteId", "louvre")]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_tables_created_on_a_shared_store_are_seen_by_every_clone() {
        let store = store();
        let shared = store.clone();

        shared.create_table("sessions", &["sessionId"]).await;
        store
            .put_item("sessions", key_of([("sessionId", "s1")]), None)
            .await
            .unwrap();

        assert_eq!(shared.len("sessions").await, Some(1));
        assert_eq!(store.len("sites").await, Some(0));
        assert_eq!(shared.len("museums").await, None);
    }

    #[tokio::test]
    async fn test_incomplete_key_is_invalid_request() {
        let store = store();
        let err = store
            .get_item("artifacts", &key_of([("siteId", "louvre")]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_conditional_put_on_existing_item_fails() {
        let store = store();
        let item = key_of([("siteId", "louvre"), ("name", "Louvre")]);
        let condition = WriteCondition::ItemNotExists {
            key_fields: vec!["siteId".to_string()],
        };

        store
            .put_item("sites", item.clone(), Some(&condition))
            .await
            .unwrap();
        let err = store
            .put_item("sites", item, Some(&condition))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::ConditionalCheckFailed(_)));
    }

    #[tokio::test]
    async fn test_update_upserts_and_returns_new_attributes() {
        let store = store();
        let key = key_of([("siteId", "louvre")]);
        let mut updates = PartialUpdate::new();
        updates.insert("name".to_string(), Some(json!("Louvre")));
        updates.insert("description".to_string(), Some(json!(null)));

        let updated = store
            .update_item("sites", &key, &build_update_expression(&updates))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            serde_json::Value::Object(updated),
            json!({"siteId": "louvre", "name": "Louvre", "description": null})
        );
    }

    #[tokio::test]
    async fn test_update_rejects_key_attributes() {
        let store = store();
        let mut updates = PartialUpdate::new();
        updates.insert("siteId".to_string(), Some(json!("orsay")));

        let err = store
            .update_item(
                "sites",
                &key_of([("siteId", "louvre")]),
                &build_update_expression(&updates),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_old_attributes() {
        let store = store();
        let item = key_of([("siteId", "louvre"), ("name", "Louvre")]);
        store.put_item("sites", item.clone(), None).await.unwrap();

        let key = key_of([("siteId", "louvre")]);
        assert_eq!(store.delete_item("sites", &key).await.unwrap(), Some(item));
        assert_eq!(store.delete_item("sites", &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_limits_are_enforced() {
        let store = store();
        let keys: Vec<Key> = (0..101)
            .map(|i| key_of([("siteId", i.to_string())]))
            .collect();
        let err = store.batch_get_item("sites", &keys).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));

        let requests: Vec<WriteRequest> = (0..26)
            .map(|i| WriteRequest::Delete(key_of([("siteId", i.to_string())])))
            .collect();
        let err = store.batch_write_item("sites", &requests).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_batch_write_and_batch_get() {
        let store = store();
        store
            .put_item("artifacts", artifact("louvre", "a0"), None)
            .await
            .unwrap();

        store
            .batch_write_item(
                "artifacts",
                &[
                    WriteRequest::Put(artifact("louvre", "a1")),
                    WriteRequest::Put(artifact("louvre", "a2")),
                    WriteRequest::Delete(key_of([("siteId", "louvre"), ("artifactId", "a0")])),
                ],
            )
            .await
            .unwrap();

        let keys: Vec<Key> = ["a0", "a1", "a2"]
            .iter()
            .map(|id| key_of([("siteId", "louvre"), ("artifactId", *id)]))
            .collect();
        let items = store.batch_get_item("artifacts", &keys).await.unwrap();

        assert_eq!(items, vec![artifact("louvre", "a1"), artifact("louvre", "a2")]);
    }

    #[tokio::test]
    async fn test_batch_write_with_bad_key_applies_nothing() {
        let store = store();
        let err = store
            .batch_write_item(
                "artifacts",
                &[
                    WriteRequest::Put(artifact("louvre", "a1")),
                    WriteRequest::Put(key_of([("siteId", "louvre")])),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidRequest(_)));
        assert_eq!(store.len("artifacts").await, Some(0));
    }

    #[tokio::test]
    async fn test_query_with_key_condition_and_filter() {
        let store = store();
        for (site, id) in [("louvre", "paint-1"), ("louvre", "paint-2"), ("louvre", "sculpt-1"), ("orsay", "paint-1")] {
            store.put_item("artifacts", artifact(site, id), None).await.unwrap();
        }

        let params = QueryParams::new("#s = :s AND begins_with(#a, :p)")
            .name("#s", "siteId")
            .name("#a", "artifactId")
            .value(":s", "louvre")
            .value(":p", "paint-");
        let page = store.query("artifacts", &params).await.unwrap();

        assert_eq!(page.items, vec![artifact("louvre", "paint-1"), artifact("louvre", "paint-2")]);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_query_backwards() {
        let store = store();
        for id in ["a1", "a2", "a3"] {
            store.put_item("artifacts", artifact("louvre", id), None).await.unwrap();
        }

        let mut params = QueryParams::new("siteId = :s").value(":s", "louvre");
        params.scan_index_forward = Some(false);
        let page = store.query("artifacts", &params).await.unwrap();

        let ids: Vec<&str> = page
            .items
            .iter()
            .filter_map(|item| item.get("artifactId").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(ids, vec!["a3", "a2", "a1"]);
    }

    #[tokio::test]
    async fn test_scan_pagination() {
        let store = store();
        for id in ["a1", "a2", "a3"] {
            store.put_item("artifacts", artifact("louvre", id), None).await.unwrap();
        }

        let first = store
            .scan("artifacts", Some(&ScanParams::default().limit(2)))
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        let next_key = first.last_evaluated_key.clone().unwrap();
        assert_eq!(next_key, key_of([("siteId", "louvre"), ("artifactId", "a2")]));

        let second = store
            .scan("artifacts", Some(&ScanParams::default().limit(2).start_after(next_key)))
            .await
            .unwrap();
        assert_eq!(second.items, vec![artifact("louvre", "a3")]);
        assert!(second.is_last());
    }

    #[tokio::test]
    async fn test_scan_empty_table() {
        let store = store();
        let page = store.scan("sites", None).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }
}
