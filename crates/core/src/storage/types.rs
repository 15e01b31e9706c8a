use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{RepositoryError, Result};

/// A store-native record: attribute name to JSON value.
pub type Item = Map<String, Value>;

/// An item holding only the primary-key attributes of an entity.
pub type Key = Item;

/// Precondition attached to a single-item write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// The write fails with `ConditionalCheckFailed` if an item with the
    /// same key already exists.
    ItemNotExists { key_fields: Vec<String> },
}

/// A single operation inside a batch write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Put(Item),
    Delete(Key),
}

/// Store-native query description, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub index_name: Option<String>,
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: BTreeMap<String, String>,
    pub expression_attribute_values: BTreeMap<String, Value>,
    pub limit: Option<u32>,
    pub scan_index_forward: Option<bool>,
    pub exclusive_start_key: Option<Key>,
}

impl QueryParams {
    /// Creates query parameters with the given key condition.
    pub fn new(key_condition_expression: impl Into<String>) -> Self {
        Self {
            key_condition_expression: key_condition_expression.into(),
            ..Default::default()
        }
    }

    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn filter(mut self, filter_expression: impl Into<String>) -> Self {
        self.filter_expression = Some(filter_expression.into());
        self
    }

    pub fn name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.expression_attribute_names
            .insert(placeholder.into(), attribute.into());
        self
    }

    pub fn value(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.expression_attribute_values
            .insert(placeholder.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, key: Key) -> Self {
        self.exclusive_start_key = Some(key);
        self
    }
}

/// Store-native scan description, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanParams {
    pub index_name: Option<String>,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: BTreeMap<String, String>,
    pub expression_attribute_values: BTreeMap<String, Value>,
    pub limit: Option<u32>,
    pub exclusive_start_key: Option<Key>,
}

impl ScanParams {
    pub fn filter(mut self, filter_expression: impl Into<String>) -> Self {
        self.filter_expression = Some(filter_expression.into());
        self
    }

    pub fn name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.expression_attribute_names
            .insert(placeholder.into(), attribute.into());
        self
    }

    pub fn value(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.expression_attribute_values
            .insert(placeholder.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, key: Key) -> Self {
        self.exclusive_start_key = Some(key);
        self
    }
}

/// One page of query or scan results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when the store has more results past this page.
    pub last_evaluated_key: Option<Key>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, last_evaluated_key: Option<Key>) -> Self {
        Self {
            items,
            last_evaluated_key,
        }
    }

    /// Returns true if there are no more pages.
    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

/// Converts an entity into a store item.
pub fn to_item<T: Serialize>(entity: &T) -> Result<Item> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RepositoryError::Serialization(format!(
            "entity must serialize to an object, got {}",
            type_name(&other)
        ))),
        Err(e) => Err(RepositoryError::Serialization(e.to_string())),
    }
}

/// Converts a store item into an entity.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T> {
    serde_json::from_value(Value::Object(item))
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Builds a key from `(field, value)` pairs.
pub fn key_of<I, K, V>(fields: I) -> Key
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Projects the given key fields out of an item.
///
/// Missing fields are skipped, so the result may be a partial key.
pub fn project_key(item: &Item, key_fields: &[&str]) -> Key {
    key_fields
        .iter()
        .filter_map(|field| item.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
