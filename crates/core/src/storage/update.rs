//! Pure functions for turning partial updates into store update expressions.

use std::collections::BTreeMap;

use serde_json::Value;

/// Field name to new value. `None` means "leave untouched" and is skipped;
/// `Some(Value::Null)` is an explicit null and is written.
pub type PartialUpdate = BTreeMap<String, Option<Value>>;

const NAME_PREFIX: &str = "#f";
const VALUE_PREFIX: &str = ":v";

/// A SET-style update with generated placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpression {
    /// e.g. `SET #f0 = :v0, #f1 = :v1`
    pub expression: String,
    /// Name placeholder to attribute name.
    pub names: BTreeMap<String, String>,
    /// Value placeholder to value.
    pub values: BTreeMap<String, Value>,
}

impl UpdateExpression {
    /// Returns true if the update assigns no fields.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of assigned fields.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Iterates over `(attribute, value)` assignments.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.names.iter().filter_map(move |(placeholder, field)| {
            let index = placeholder.strip_prefix(NAME_PREFIX)?;
            let value = self.values.get(&format!("{VALUE_PREFIX}{index}"))?;
            Some((field.as_str(), value))
        })
    }
}

/// Builds a SET update expression from a partial update.
///
/// Each included field gets exactly one `#fN`/`:vN` placeholder pair.
/// Placeholders are numbered in the map's key order, so the output is
/// deterministic for a given input.
///
/// # Examples
///
/// ```
/// use entityrepo_core::storage::{build_update_expression, PartialUpdate};
/// use serde_json::{json, Value};
///
/// let mut updates = PartialUpdate::new();
/// updates.insert("name".to_string(), Some(json!("Louvre")));
/// updates.insert("description".to_string(), None);
/// updates.insert("closedOn".to_string(), Some(Value::Null));
///
/// let update = build_update_expression(&updates);
/// assert_eq!(update.expression, "SET #f0 = :v0, #f1 = :v1");
/// assert_eq!(update.names["#f0"], "closedOn");
/// assert_eq!(update.names["#f1"], "name");
/// assert_eq!(update.values[":v0"], Value::Null);
/// ```
pub fn build_update_expression(updates: &PartialUpdate) -> UpdateExpression {
    let mut clauses = Vec::with_capacity(updates.len());
    let mut names = BTreeMap::new();
    let mut values = BTreeMap::new();

    for (index, (field, value)) in updates
        .iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (field, v)))
        .enumerate()
    {
        let name = format!("{NAME_PREFIX}{index}");
        let placeholder = format!("{VALUE_PREFIX}{index}");
        clauses.push(format!("{name} = {placeholder}"));
        names.insert(name, field.clone());
        values.insert(placeholder, value.clone());
    }

    let expression = if clauses.is_empty() {
        String::new()
    } else {
        format!("SET {}", clauses.join(", "))
    };

    UpdateExpression {
        expression,
        names,
        values,
    }
}
