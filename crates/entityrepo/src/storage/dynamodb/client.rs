//! DynamoDB `StoreClient` implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeValue, DeleteRequest, KeysAndAttributes, PutRequest, ReturnValue,
    WriteRequest as DynamoWriteRequest,
};
use aws_sdk_dynamodb::Client;

use entityrepo_core::storage::{
    Item, Key, Page, QueryParams, ScanParams, StoreClient, StoreError, StoreResult,
    UpdateExpression, WriteCondition, WriteRequest,
};

use super::conversions::{
    from_attributes, to_attributes, to_expression_names, to_expression_values,
};
use super::error::{map_build_error, map_sdk_error};

/// Default number of times unprocessed batch entries are resubmitted.
pub const DEFAULT_UNPROCESSED_ROUNDS: u32 = 3;

/// Pause before the first resubmission; doubles each round.
const UNPROCESSED_BACKOFF: Duration = Duration::from_millis(50);

/// AWS client configuration.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}

impl AwsConfig {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

/// DynamoDB-backed store.
///
/// A single client serves every table; the table name is passed per call.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    unprocessed_rounds: u32,
}

impl DynamoDbStore {
    /// Creates a store around an existing DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            unprocessed_rounds: DEFAULT_UNPROCESSED_ROUNDS,
        }
    }

    /// Sets how many times unprocessed batch entries are resubmitted before
    /// the call fails with a retryable `Throttled` error.
    pub fn with_unprocessed_rounds(mut self, rounds: u32) -> Self {
        self.unprocessed_rounds = rounds;
        self
    }

    /// Creates a store with the given AWS configuration.
    pub async fn connect(config: &AwsConfig) -> Self {
        let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
        }

        let sdk_config = sdk_config_loader.load().await;
        tracing::info!(target = %config.target_display(), "DynamoDB client configured");
        Self::new(Client::new(&sdk_config))
    }

    /// Creates a store from `AWS_REGION` and `AWS_ENDPOINT_URL`.
    pub async fn from_env() -> Self {
        Self::connect(&AwsConfig::default()).await
    }

    async fn pause_before_resubmit(round: u32) {
        tokio::time::sleep(UNPROCESSED_BACKOFF * 2u32.saturating_pow(round)).await;
    }
}

/// Builds `attribute_not_exists` over every key field.
pub fn item_not_exists_condition(key_fields: &[String]) -> (String, HashMap<String, String>) {
    let mut clauses = Vec::with_capacity(key_fields.len());
    let mut names = HashMap::with_capacity(key_fields.len());
    for (index, field) in key_fields.iter().enumerate() {
        let placeholder = format!("#k{index}");
        clauses.push(format!("attribute_not_exists({placeholder})"));
        names.insert(placeholder, field.clone());
    }
    (clauses.join(" AND "), names)
}

fn to_dynamo_write_request(request: &WriteRequest) -> StoreResult<DynamoWriteRequest> {
    let request = match request {
        WriteRequest::Put(item) => DynamoWriteRequest::builder()
            .put_request(
                PutRequest::builder()
                    .set_item(Some(to_attributes(item)))
                    .build()
                    .map_err(map_build_error)?,
            )
            .build(),
        WriteRequest::Delete(key) => DynamoWriteRequest::builder()
            .delete_request(
                DeleteRequest::builder()
                    .set_key(Some(to_attributes(key)))
                    .build()
                    .map_err(map_build_error)?,
            )
            .build(),
    };
    Ok(request)
}

fn to_page(
    items: Option<Vec<HashMap<String, AttributeValue>>>,
    last_evaluated_key: Option<HashMap<String, AttributeValue>>,
) -> StoreResult<Page<Item>> {
    let items = items
        .unwrap_or_default()
        .iter()
        .map(from_attributes)
        .collect::<StoreResult<Vec<_>>>()?;
    let last_evaluated_key = last_evaluated_key
        .filter(|key| !key.is_empty())
        .as_ref()
        .map(from_attributes)
        .transpose()?;
    Ok(Page::new(items, last_evaluated_key))
}

fn to_limit(limit: Option<u32>) -> Option<i32> {
    limit.map(|l| i32::try_from(l).unwrap_or(i32::MAX))
}

#[async_trait]
impl StoreClient for DynamoDbStore {
    async fn get_item(&self, table: &str, key: &Key) -> StoreResult<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_attributes(key)))
            .send()
            .await
            .map_err(map_sdk_error)?;

        result.item.as_ref().map(from_attributes).transpose()
    }

    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&WriteCondition>,
    ) -> StoreResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attributes(&item)));

        if let Some(WriteCondition::ItemNotExists { key_fields }) = condition {
            let (expression, names) = item_not_exists_condition(key_fields);
            request = request
                .condition_expression(expression)
                .set_expression_attribute_names(Some(names));
        }

        request.send().await.map_err(map_sdk_error)?;
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &Key,
        update: &UpdateExpression,
    ) -> StoreResult<Option<Item>> {
        let result = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(to_attributes(key)))
            .update_expression(&update.expression)
            .set_expression_attribute_names(to_expression_names(&update.names))
            .set_expression_attribute_values(to_expression_values(&update.values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(map_sdk_error)?;

        result.attributes.as_ref().map(from_attributes).transpose()
    }

    async fn delete_item(&self, table: &str, key: &Key) -> StoreResult<Option<Item>> {
        let result = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_attributes(key)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(map_sdk_error)?;

        result.attributes.as_ref().map(from_attributes).transpose()
    }

    async fn batch_get_item(&self, table: &str, keys: &[Key]) -> StoreResult<Vec<Item>> {
        let keys_and_attributes = KeysAndAttributes::builder()
            .set_keys(Some(keys.iter().map(to_attributes).collect()))
            .build()
            .map_err(map_build_error)?;
        let mut pending = HashMap::from([(table.to_string(), keys_and_attributes)]);
        let mut items = Vec::with_capacity(keys.len());

        for round in 0..=self.unprocessed_rounds {
            if round > 0 {
                Self::pause_before_resubmit(round - 1).await;
            }

            let result = self
                .client
                .batch_get_item()
                .set_request_items(Some(pending))
                .send()
                .await
                .map_err(map_sdk_error)?;

            if let Some(found) = result.responses.and_then(|mut r| r.remove(table)) {
                for item in &found {
                    items.push(from_attributes(item)?);
                }
            }

            match result.unprocessed_keys.filter(|u| !u.is_empty()) {
                Some(unprocessed) => {
                    tracing::debug!(table, round, "Resubmitting unprocessed keys");
                    pending = unprocessed;
                }
                None => return Ok(items),
            }
        }

        Err(StoreError::Throttled(format!(
            "unprocessed keys remain after {} resubmissions",
            self.unprocessed_rounds
        )))
    }

    async fn batch_write_item(&self, table: &str, requests: &[WriteRequest]) -> StoreResult<()> {
        let write_requests = requests
            .iter()
            .map(to_dynamo_write_request)
            .collect::<StoreResult<Vec<_>>>()?;
        let mut pending = HashMap::from([(table.to_string(), write_requests)]);

        for round in 0..=self.unprocessed_rounds {
            if round > 0 {
                Self::pause_before_resubmit(round - 1).await;
            }

            let result = self
                .client
                .batch_write_item()
                .set_request_items(Some(pending))
                .send()
                .await
                .map_err(map_sdk_error)?;

            match result.unprocessed_items.filter(|u| !u.is_empty()) {
                Some(unprocessed) => {
                    tracing::debug!(table, round, "Resubmitting unprocessed items");
                    pending = unprocessed;
                }
                None => return Ok(()),
            }
        }

        Err(StoreError::Throttled(format!(
            "unprocessed items remain after {} resubmissions",
            self.unprocessed_rounds
        )))
    }

    async fn query(&self, table: &str, params: &QueryParams) -> StoreResult<Page<Item>> {
        let result = self
            .client
            .query()
            .table_name(table)
            .set_index_name(params.index_name.clone())
            .key_condition_expression(&params.key_condition_expression)
            .set_filter_expression(params.filter_expression.clone())
            .set_expression_attribute_names(to_expression_names(
                &params.expression_attribute_names,
            ))
            .set_expression_attribute_values(to_expression_values(
                &params.expression_attribute_values,
            ))
            .set_limit(to_limit(params.limit))
            .set_scan_index_forward(params.scan_index_forward)
            .set_exclusive_start_key(params.exclusive_start_key.as_ref().map(to_attributes))
            .send()
            .await
            .map_err(map_sdk_error)?;

        to_page(result.items, result.last_evaluated_key)
    }

    async fn scan(&self, table: &str, params: Option<&ScanParams>) -> StoreResult<Page<Item>> {
        let mut request = self.client.scan().table_name(table);

        if let Some(params) = params {
            request = request
                .set_index_name(params.index_name.clone())
                .set_filter_expression(params.filter_expression.clone())
                .set_expression_attribute_names(to_expression_names(
                    &params.expression_attribute_names,
                ))
                .set_expression_attribute_values(to_expression_values(
                    &params.expression_attribute_values,
                ))
                .set_limit(to_limit(params.limit))
                .set_exclusive_start_key(params.exclusive_start_key.as_ref().map(to_attributes));
        }

        let result = request.send().await.map_err(map_sdk_error)?;
        to_page(result.items, result.last_evaluated_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityrepo_core::storage::key_of;

    #[test]
    fn test_item_not_exists_condition_covers_every_key_field() {
        let (expression, names) =
            item_not_exists_condition(&["siteId".to_string(), "artifactId".to_string()]);

        assert_eq!(
            expression,
            "attribute_not_exists(#k0) AND attribute_not_exists(#k1)"
        );
        assert_eq!(names.get("#k0").map(String::as_str), Some("siteId"));
        assert_eq!(names.get("#k1").map(String::as_str), Some("artifactId"));
    }

    #[test]
    fn test_write_requests_convert() {
        let put = to_dynamo_write_request(&WriteRequest::Put(key_of([("siteId", "louvre")])))
            .unwrap();
        let delete =
            to_dynamo_write_request(&WriteRequest::Delete(key_of([("siteId", "orsay")])))
                .unwrap();

        assert_eq!(
            put.put_request().map(|p| p.item().get("siteId").cloned()),
            Some(Some(AttributeValue::S("louvre".to_string())))
        );
        assert_eq!(
            delete.delete_request().map(|d| d.key().get("siteId").cloned()),
            Some(Some(AttributeValue::S("orsay".to_string())))
        );
    }

    #[test]
    fn test_empty_last_evaluated_key_means_last_page() {
        let page = to_page(None, Some(HashMap::new())).unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
    }

    #[test]
    fn test_limit_saturates() {
        assert_eq!(to_limit(Some(10)), Some(10));
        assert_eq!(to_limit(Some(u32::MAX)), Some(i32::MAX));
        assert_eq!(to_limit(None), None);
    }

    #[test]
    fn test_aws_config_display() {
        let local = AwsConfig {
            endpoint_url: Some("http://localhost:8000".to_string()),
            region: "us-east-1".to_string(),
        };
        let remote = AwsConfig {
            endpoint_url: None,
            region: "eu-west-1".to_string(),
        };

        assert_eq!(local.target_display(), "Local DynamoDB (http://localhost:8000)");
        assert_eq!(remote.target_display(), "AWS DynamoDB (region: eu-west-1)");
    }
}
