use async_trait::async_trait;

use super::{
    Item, Key, Page, QueryParams, ScanParams, StoreError, UpdateExpression, WriteCondition,
    WriteRequest,
};

/// Result type for store client calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Client for a remote key-value/document store, addressed per table.
///
/// Implementations own connection handling and network timeouts. Batch calls
/// are never handed more items than the repository's configured limits.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Reads one item. Absence is `Ok(None)`, not an error.
    async fn get_item(&self, table: &str, key: &Key) -> StoreResult<Option<Item>>;

    /// Writes one item, optionally guarded by a precondition.
    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&WriteCondition>,
    ) -> StoreResult<()>;

    /// Applies an update and returns the item's attributes after the update.
    async fn update_item(
        &self,
        table: &str,
        key: &Key,
        update: &UpdateExpression,
    ) -> StoreResult<Option<Item>>;

    /// Deletes one item and returns its attributes before the delete.
    async fn delete_item(&self, table: &str, key: &Key) -> StoreResult<Option<Item>>;

    /// Reads several items in one call. Missing items are omitted.
    async fn batch_get_item(&self, table: &str, keys: &[Key]) -> StoreResult<Vec<Item>>;

    /// Applies several puts and deletes in one call.
    async fn batch_write_item(&self, table: &str, requests: &[WriteRequest]) -> StoreResult<()>;

    async fn query(&self, table: &str, params: &QueryParams) -> StoreResult<Page<Item>>;

    async fn scan(&self, table: &str, params: Option<&ScanParams>) -> StoreResult<Page<Item>>;
}
