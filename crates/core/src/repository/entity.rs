//! Generic entity repository over a `StoreClient`.
//!
//! Every store call goes through the `RetryExecutor`. Single-item reads are
//! read-through cached, writes are write-through, and deletes invalidate.
//! The cache is only touched after the store has confirmed a result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStats, CacheStore};
use crate::retry::{ConfigError, RetryExecutor};
use crate::storage::{
    build_update_expression, from_item, to_item, Item, Key, Page, PartialUpdate, QueryParams,
    RepositoryError, Result, ScanParams, StoreClient, StoreError, WriteCondition, WriteRequest,
};

use super::{BatchLimits, EntityHooks, RepositoryConfig};

/// Options for `EntityRepository::put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    /// When false, the put fails with `ConditionalCheckFailed` if an item
    /// with the same key already exists.
    pub overwrite: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

impl PutOptions {
    pub fn no_overwrite() -> Self {
        Self { overwrite: false }
    }
}

/// Data-access layer for one entity type stored in one table.
///
/// # Type Parameters
///
/// * `H` - Entity hooks: validation, primary key and cache key
/// * `S` - The store client
pub struct EntityRepository<H, S>
where
    H: EntityHooks,
    S: StoreClient + ?Sized,
{
    hooks: H,
    store: Arc<S>,
    table_name: String,
    retry: RetryExecutor,
    cache: Option<CacheStore<Item>>,
    cache_ttl: Duration,
    limits: BatchLimits,
}

impl<H, S> EntityRepository<H, S>
where
    H: EntityHooks,
    S: StoreClient + ?Sized,
{
    /// Creates a repository. Fails if the retry or batch settings are out
    /// of range.
    pub fn new(
        hooks: H,
        store: Arc<S>,
        config: RepositoryConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let retry = RetryExecutor::new(config.retry)?;
        config.limits.validate()?;

        let cache = config
            .cache
            .enabled
            .then(|| CacheStore::new(config.cache.capacity()));

        Ok(Self {
            hooks,
            store,
            table_name: config.table_name,
            retry,
            cache,
            cache_ttl: config.cache.ttl,
            limits: config.limits,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Cache statistics, or `None` when caching is disabled.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Drops the cached copy of one entity, if any.
    pub async fn invalidate(&self, key: &Key) {
        self.forget(&self.hooks.cache_key(key)).await;
    }

    /// Drops every cached entity.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }

    /// Reads one entity. A missing item is `Ok(None)` and is never cached.
    pub async fn get(&self, key: &Key) -> Result<Option<H::Entity>> {
        let cache_key = self.hooks.cache_key(key);

        if let Some(item) = self.cached(&cache_key).await {
            match from_item(item) {
                Ok(entity) => {
                    tracing::trace!(table = %self.table_name, %cache_key, "Cache hit");
                    return Ok(Some(entity));
                }
                Err(err) => {
                    // Undecodable cache entry - fall back to the store
                    tracing::warn!(table = %self.table_name, %cache_key, error = %err, "Cached item decode failed");
                    self.forget(&cache_key).await;
                }
            }
        }

        tracing::trace!(table = %self.table_name, %cache_key, "Cache miss");
        let store = &self.store;
        let table = self.table_name.as_str();
        let item = self
            .retry
            .execute("get_item", move || store.get_item(table, key))
            .await?;

        let Some(item) = item else {
            return Ok(None);
        };

        let entity = from_item(item.clone())?;
        self.remember(cache_key, item).await;
        Ok(Some(entity))
    }

    /// Validates and writes one entity, then caches it.
    ///
    /// Invalid entities fail with `RepositoryError::Validation` before any
    /// store I/O. With `overwrite: false` an existing item makes the call
    /// fail with `RepositoryError::ConditionalCheckFailed`.
    pub async fn put(&self, entity: &H::Entity, options: PutOptions) -> Result<()> {
        self.ensure_valid(entity)?;

        let item = to_item(entity)?;
        let key = self.hooks.primary_key(entity);
        let cache_key = self.hooks.cache_key(&key);
        let condition = (!options.overwrite).then(|| WriteCondition::ItemNotExists {
            key_fields: key.keys().cloned().collect(),
        });

        let store = &self.store;
        let table = self.table_name.as_str();
        let item_ref = &item;
        let condition_ref = condition.as_ref();
        let result = self
            .retry
            .execute("put_item", move || {
                store.put_item(table, item_ref.clone(), condition_ref)
            })
            .await;

        match result {
            Ok(()) => {}
            Err(StoreError::ConditionalCheckFailed(_)) => {
                return Err(RepositoryError::ConditionalCheckFailed {
                    table: self.table_name.clone(),
                    key: cache_key,
                });
            }
            Err(err) => return Err(err.into()),
        }

        tracing::debug!(table = %self.table_name, %cache_key, overwrite = options.overwrite, "Item put");
        self.remember(cache_key, item).await;
        Ok(())
    }

    /// Applies a partial update and returns the entity as stored afterwards.
    ///
    /// Fields mapped to `None` are left untouched. An update with no fields
    /// to set is a validation error. A store that reports no attributes
    /// yields `Ok(None)` and drops any cached copy.
    pub async fn update(&self, key: &Key, updates: &PartialUpdate) -> Result<Option<H::Entity>> {
        let update = build_update_expression(updates);
        if update.is_empty() {
            return Err(RepositoryError::Validation(vec![
                "update must set at least one field".to_string(),
            ]));
        }

        let cache_key = self.hooks.cache_key(key);
        let store = &self.store;
        let table = self.table_name.as_str();
        let update_ref = &update;
        let result = self
            .retry
            .execute("update_item", move || store.update_item(table, key, update_ref))
            .await;

        match result {
            Ok(Some(item)) => match from_item(item.clone()) {
                Ok(entity) => {
                    tracing::debug!(table = %self.table_name, %cache_key, fields = update.len(), "Item updated");
                    self.remember(cache_key, item).await;
                    Ok(Some(entity))
                }
                Err(err) => {
                    self.forget(&cache_key).await;
                    Err(err)
                }
            },
            Ok(None) => {
                self.forget(&cache_key).await;
                Ok(None)
            }
            Err(err) => {
                // The write may or may not have landed
                self.forget(&cache_key).await;
                Err(err.into())
            }
        }
    }

    /// Deletes one entity and returns it as it was before the delete.
    ///
    /// The cached copy is dropped whatever the outcome.
    pub async fn delete(&self, key: &Key) -> Result<Option<H::Entity>> {
        let cache_key = self.hooks.cache_key(key);
        let store = &self.store;
        let table = self.table_name.as_str();
        let result = self
            .retry
            .execute("delete_item", move || store.delete_item(table, key))
            .await;

        self.forget(&cache_key).await;

        let previous = result?;
        tracing::debug!(table = %self.table_name, %cache_key, existed = previous.is_some(), "Item deleted");
        previous.map(from_item).transpose()
    }

    /// Runs a store-native query and returns the first page of entities.
    pub async fn query(&self, params: &QueryParams) -> Result<Vec<H::Entity>> {
        Ok(self.query_page(params).await?.items)
    }

    /// Runs a store-native query, keeping the continuation key.
    pub async fn query_page(&self, params: &QueryParams) -> Result<Page<H::Entity>> {
        let store = &self.store;
        let table = self.table_name.as_str();
        let page = self
            .retry
            .execute("query", move || store.query(table, params))
            .await?;

        decode_page(page)
    }

    /// Scans the table and returns the first page of entities.
    pub async fn scan(&self, params: Option<&ScanParams>) -> Result<Vec<H::Entity>> {
        Ok(self.scan_page(params).await?.items)
    }

    /// Scans the table, keeping the continuation key.
    pub async fn scan_page(&self, params: Option<&ScanParams>) -> Result<Page<H::Entity>> {
        let store = &self.store;
        let table = self.table_name.as_str();
        let page = self
            .retry
            .execute("scan", move || store.scan(table, params))
            .await?;

        decode_page(page)
    }

    /// Reads many entities, at most `max_batch_get` keys per store call.
    ///
    /// Keys with no item are left out of the result. Repeated keys are read
    /// once. Fetched entities are cached like single reads.
    pub async fn batch_get(&self, keys: &[Key]) -> Result<Vec<H::Entity>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<Key> = keys
            .iter()
            .filter(|key| seen.insert(self.hooks.cache_key(key)))
            .cloned()
            .collect();

        let store = &self.store;
        let table = self.table_name.as_str();
        let mut entities = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(self.limits.max_batch_get) {
            let items = self
                .retry
                .execute("batch_get_item", move || store.batch_get_item(table, chunk))
                .await?;

            for item in items {
                let entity: H::Entity = from_item(item.clone())?;
                let cache_key = self.hooks.cache_key(&self.hooks.primary_key(&entity));
                self.remember(cache_key, item).await;
                entities.push(entity);
            }
        }

        tracing::debug!(table = %self.table_name, requested = keys.len(), found = entities.len(), "Batch get");
        Ok(entities)
    }

    /// Writes many puts and deletes, at most `max_batch_write` of them
    /// (combined) per store call, in order.
    ///
    /// Every put is validated first; any violation aborts the whole call
    /// before the first store call. A failing chunk stops the run, leaving
    /// earlier chunks committed.
    pub async fn batch_write(&self, puts: &[H::Entity], deletes: &[Key]) -> Result<()> {
        if puts.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let errors: Vec<String> = puts
            .iter()
            .enumerate()
            .flat_map(|(index, entity)| {
                self.hooks
                    .validate_entity(entity)
                    .errors
                    .into_iter()
                    .map(move |error| format!("item {index}: {error}"))
            })
            .collect();
        if !errors.is_empty() {
            return Err(RepositoryError::Validation(errors));
        }

        // Requests and the cache entry each one touches, in the same order.
        let mut requests = Vec::with_capacity(puts.len() + deletes.len());
        let mut touched: Vec<(String, Option<Item>)> = Vec::with_capacity(requests.capacity());
        for entity in puts {
            let item = to_item(entity)?;
            let cache_key = self.hooks.cache_key(&self.hooks.primary_key(entity));
            touched.push((cache_key, Some(item.clone())));
            requests.push(WriteRequest::Put(item));
        }
        for key in deletes {
            touched.push((self.hooks.cache_key(key), None));
            requests.push(WriteRequest::Delete(key.clone()));
        }

        let store = &self.store;
        let table = self.table_name.as_str();
        let chunk_size = self.limits.max_batch_write;

        for (chunk, touched) in requests.chunks(chunk_size).zip(touched.chunks(chunk_size)) {
            let result = self
                .retry
                .execute("batch_write_item", move || {
                    store.batch_write_item(table, chunk)
                })
                .await;

            if let Err(err) = result {
                // Part of the chunk may have been applied
                for (cache_key, _) in touched {
                    self.forget(cache_key).await;
                }
                return Err(err.into());
            }

            for (cache_key, item) in touched {
                match item {
                    Some(item) => self.remember(cache_key.clone(), item.clone()).await,
                    None => self.forget(cache_key).await,
                }
            }
        }

        tracing::debug!(table = %self.table_name, puts = puts.len(), deletes = deletes.len(), "Batch write");
        Ok(())
    }

    fn ensure_valid(&self, entity: &H::Entity) -> Result<()> {
        let validation = self.hooks.validate_entity(entity);
        if validation.is_valid() {
            Ok(())
        } else {
            Err(RepositoryError::Validation(validation.errors))
        }
    }

    async fn cached(&self, cache_key: &str) -> Option<Item> {
        match &self.cache {
            Some(cache) => cache.get(cache_key).await,
            None => None,
        }
    }

    async fn remember(&self, cache_key: String, item: Item) {
        if let Some(cache) = &self.cache {
            cache.set(cache_key, item, self.cache_ttl).await;
        }
    }

    async fn forget(&self, cache_key: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(cache_key).await;
        }
    }
}

fn decode_page<T: serde::de::DeserializeOwned>(page: Page<Item>) -> Result<Page<T>> {
    let items = page
        .items
        .into_iter()
        .map(from_item)
        .collect::<Result<Vec<T>>>()?;
    Ok(Page::new(items, page.last_evaluated_key))
}
