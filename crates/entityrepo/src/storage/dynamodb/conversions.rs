//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB `AttributeValue` maps and
//! JSON items. These are testable in isolation without DynamoDB access.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_dynamodb::types::AttributeValue;
use entityrepo_core::storage::{Item, StoreError, StoreResult};
use serde_json::{Number, Value};

// ============================================================================
// JSON -> AttributeValue
// ============================================================================

/// Convert a JSON value to an attribute value.
pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attributes(map)),
    }
}

/// Convert a JSON item to a DynamoDB item.
pub fn to_attributes(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect()
}

/// Convert placeholder values of an expression to attribute values.
pub fn to_expression_values(
    values: &BTreeMap<String, Value>,
) -> Option<HashMap<String, AttributeValue>> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(|(k, v)| (k.clone(), to_attribute(v)))
            .collect(),
    )
}

/// Convert placeholder names of an expression.
pub fn to_expression_names(names: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    if names.is_empty() {
        return None;
    }
    Some(names.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

// ============================================================================
// AttributeValue -> JSON
// ============================================================================

/// Convert an attribute value to JSON.
///
/// Binary attributes have no JSON form and fail with a serialization error.
pub fn from_attribute(value: &AttributeValue) -> StoreResult<Value> {
    match value {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => parse_number(n).map(Value::Number),
        AttributeValue::Ss(values) => Ok(Value::Array(
            values.iter().cloned().map(Value::String).collect(),
        )),
        AttributeValue::Ns(values) => values
            .iter()
            .map(|n| parse_number(n).map(Value::Number))
            .collect::<StoreResult<Vec<_>>>()
            .map(Value::Array),
        AttributeValue::L(values) => values
            .iter()
            .map(from_attribute)
            .collect::<StoreResult<Vec<_>>>()
            .map(Value::Array),
        AttributeValue::M(map) => from_attributes(map).map(Value::Object),
        AttributeValue::B(_) | AttributeValue::Bs(_) => Err(StoreError::Serialization(
            "binary attributes are not supported".to_string(),
        )),
        other => Err(StoreError::Serialization(format!(
            "unsupported attribute value: {other:?}"
        ))),
    }
}

/// Convert a DynamoDB item to a JSON item.
pub fn from_attributes(item: &HashMap<String, AttributeValue>) -> StoreResult<Item> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_attribute(v)?)))
        .collect()
}

/// Parse a DynamoDB number string, preferring integer representations.
fn parse_number(raw: &str) -> StoreResult<Number> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Number::from(n));
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(Number::from(n));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| StoreError::Serialization(format!("invalid number: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(to_attribute(&json!(null)), AttributeValue::Null(true));
        assert_eq!(to_attribute(&json!(true)), AttributeValue::Bool(true));
        assert_eq!(to_attribute(&json!(42)), AttributeValue::N("42".to_string()));
        assert_eq!(to_attribute(&json!(1.5)), AttributeValue::N("1.5".to_string()));
        assert_eq!(
            to_attribute(&json!("louvre")),
            AttributeValue::S("louvre".to_string())
        );
    }

    #[test]
    fn test_nested_item_survives_conversion() {
        let original = item(json!({
            "siteId": "louvre",
            "languages": ["en", "fr"],
            "visits": 1200,
            "rating": 4.5,
            "description": null,
            "meta": {"open": true, "floors": [0, 1, 2]}
        }));

        let back = from_attributes(&to_attributes(&original)).unwrap();

        assert_eq!(back, original);
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(
            from_attribute(&AttributeValue::N("-7".to_string())).unwrap(),
            json!(-7)
        );
        assert_eq!(
            from_attribute(&AttributeValue::N("18446744073709551615".to_string())).unwrap(),
            json!(u64::MAX)
        );
        assert_eq!(
            from_attribute(&AttributeValue::N("2.25".to_string())).unwrap(),
            json!(2.25)
        );
        assert!(from_attribute(&AttributeValue::N("abc".to_string())).is_err());
    }

    #[test]
    fn test_sets_become_arrays() {
        let strings = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        let numbers = AttributeValue::Ns(vec!["1".to_string(), "2".to_string()]);

        assert_eq!(from_attribute(&strings).unwrap(), json!(["a", "b"]));
        assert_eq!(from_attribute(&numbers).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_binary_is_rejected() {
        let binary = AttributeValue::B(aws_sdk_dynamodb::primitives::Blob::new(vec![1, 2]));
        let err = from_attribute(&binary).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_empty_expression_maps_are_omitted() {
        assert!(to_expression_values(&BTreeMap::new()).is_none());
        assert!(to_expression_names(&BTreeMap::new()).is_none());

        let mut names = BTreeMap::new();
        names.insert("#f0".to_string(), "name".to_string());
        let converted = to_expression_names(&names).unwrap();
        assert_eq!(converted.get("#f0").map(String::as_str), Some("name"));
    }
}
