use serde_json::Value;

use crate::storage::Key;

/// Returns the default cache key for a primary key.
///
/// The key is a compact JSON object with its fields sorted by name, so
/// equal keys always render identically regardless of how the map orders
/// them, and distinct keys never collide.
///
/// # Examples
///
/// ```
/// use entityrepo_core::cache::default_cache_key;
/// use entityrepo_core::storage::key_of;
///
/// let key = key_of([("siteId", "s1"), ("artifactId", "a1")]);
/// assert_eq!(default_cache_key(&key), r#"{"artifactId":"a1","siteId":"s1"}"#);
/// ```
pub fn default_cache_key(key: &Key) -> String {
    let mut fields: Vec<(&String, &Value)> = key.iter().collect();
    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let body = fields
        .iter()
        .map(|(name, value)| format!("{}:{}", Value::from(name.as_str()), value))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{body}}}")
}

/// Returns a `prefix:part1:part2` cache key from the given key fields.
///
/// Each part is the JSON rendering of the field value, so strings are
/// quoted and any `:` inside them cannot be mistaken for a separator.
/// Missing fields render as an empty segment.
pub fn prefixed_cache_key(prefix: &str, key: &Key, fields: &[&str]) -> String {
    let mut out = String::from(prefix);
    for field in fields {
        out.push(':');
        if let Some(value) = key.get(*field) {
            out.push_str(&value.to_string());
        }
    }
    out
}
