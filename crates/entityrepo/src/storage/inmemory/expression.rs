//! Evaluator for the expression subset the in-memory store understands.
//!
//! Supported: `a = b` and `begins_with(a, b)` clauses joined by `AND`.
//! Operands are `#name` placeholders, `:value` placeholders or bare
//! attribute names.

use std::collections::BTreeMap;

use entityrepo_core::storage::{Item, StoreError, StoreResult};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attribute(String),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Equals(Operand, Operand),
    BeginsWith(Operand, Operand),
}

/// A parsed conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    /// Parses `expression`, resolving placeholders against `names` and
    /// `values`.
    pub fn parse(
        expression: &str,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, Value>,
    ) -> StoreResult<Self> {
        let clauses = split_and(expression)
            .into_iter()
            .map(|clause| parse_clause(clause, names, values))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    /// Parses an optional expression; `None` matches every item.
    pub fn parse_optional(
        expression: Option<&str>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, Value>,
    ) -> StoreResult<Self> {
        match expression {
            Some(expression) => Self::parse(expression, names, values),
            None => Ok(Self::default()),
        }
    }

    /// Conjunction of both conditions.
    pub fn and(mut self, other: Self) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Equals(left, right) => match (resolve(left, item), resolve(right, item)) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            },
            Clause::BeginsWith(target, prefix) => {
                match (resolve(target, item), resolve(prefix, item)) {
                    (Some(Value::String(t)), Some(Value::String(p))) => t.starts_with(p.as_str()),
                    _ => false,
                }
            }
        })
    }
}

fn resolve<'a>(operand: &'a Operand, item: &'a Item) -> Option<&'a Value> {
    match operand {
        Operand::Attribute(name) => item.get(name),
        Operand::Literal(value) => Some(value),
    }
}

/// Splits on the `AND` keyword, case-insensitively.
fn split_and(expression: &str) -> Vec<&str> {
    // ASCII uppercasing keeps byte offsets aligned with the original
    let upper = expression.to_ascii_uppercase();
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some(offset) = upper[start..].find(" AND ") {
        parts.push(&expression[start..start + offset]);
        start += offset + " AND ".len();
    }
    parts.push(&expression[start..]);
    parts
}

fn parse_clause(
    clause: &str,
    names: &BTreeMap<String, String>,
    values: &BTreeMap<String, Value>,
) -> StoreResult<Clause> {
    let clause = clause.trim();
    let lower = clause.to_ascii_lowercase();

    if let Some(rest) = lower.strip_prefix("begins_with") {
        let args = rest
            .trim_start()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| invalid(format!("malformed begins_with clause: {clause}")))?;
        // Slice the original text so placeholder case is preserved
        let args_start = clause.len() - args.len() - 1;
        let args = &clause[args_start..clause.len() - 1];
        let (target, prefix) = args
            .split_once(',')
            .ok_or_else(|| invalid(format!("begins_with needs two arguments: {clause}")))?;
        return Ok(Clause::BeginsWith(
            parse_operand(target, names, values)?,
            parse_operand(prefix, names, values)?,
        ));
    }

    match clause.split_once('=') {
        Some((left, right)) => Ok(Clause::Equals(
            parse_operand(left, names, values)?,
            parse_operand(right, names, values)?,
        )),
        None => Err(invalid(format!("unsupported condition: {clause}"))),
    }
}

fn parse_operand(
    token: &str,
    names: &BTreeMap<String, String>,
    values: &BTreeMap<String, Value>,
) -> StoreResult<Operand> {
    let token = token.trim();
    if token.is_empty() {
        return Err(invalid("empty operand".to_string()));
    }
    if token.starts_with('#') {
        return names
            .get(token)
            .map(|name| Operand::Attribute(name.clone()))
            .ok_or_else(|| invalid(format!("undefined attribute name placeholder {token}")));
    }
    if token.starts_with(':') {
        return values
            .get(token)
            .map(|value| Operand::Literal(value.clone()))
            .ok_or_else(|| invalid(format!("undefined attribute value placeholder {token}")));
    }
    Ok(Operand::Attribute(token.to_string()))
}

fn invalid(message: String) -> StoreError {
    StoreError::InvalidRequest(message)
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

    fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn values(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_equality_with_placeholders() {
        let condition = Condition::parse(
            "#s = :site",
            &names(&[("#s", "siteId")]),
            &values(&[(":site", json!("louvre"))]),
        )
        .unwrap();

        assert!(condition.matches(&item(json!({"siteId": "louvre"}))));
        assert!(!condition.matches(&item(json!({"siteId": "orsay"}))));
        assert!(!condition.matches(&item(json!({"name": "louvre"}))));
    }

    #[test]
    fn test_begins_with_and_conjunction() {
        let condition = Condition::parse(
            "siteId = :site and begins_with(#a, :prefix)",
            &names(&[("#a", "artifactId")]),
            &values(&[(":site", json!("louvre")), (":prefix", json!("paint-"))]),
        )
        .unwrap();

        assert!(condition.matches(&item(
            json!({"siteId": "louvre", "artifactId": "paint-001"})
        )));
        assert!(!condition.matches(&item(
            json!({"siteId": "louvre", "artifactId": "sculpt-001"})
        )));
        assert!(!condition.matches(&item(
            json!({"siteId": "orsay", "artifactId": "paint-001"})
        )));
    }

    #[test]
    fn test_begins_with_requires_strings() {
        let condition = Condition::parse(
            "begins_with(count, :p)",
            &BTreeMap::new(),
            &values(&[(":p", json!("1"))]),
        )
        .unwrap();

        assert!(!condition.matches(&item(json!({"count": 12}))));
    }

    #[test]
    fn test_undefined_placeholder_is_invalid_request() {
        let err = Condition::parse("#missing = :v", &BTreeMap::new(), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_unsupported_operator_is_invalid_request() {
        let err = Condition::parse(
            "size > :n",
            &BTreeMap::new(),
            &values(&[(":n", json!(1))]),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_expression_matches_everything() {
        let condition =
            Condition::parse_optional(None, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        assert!(condition.matches(&item(json!({"anything": true}))));
    }
}
