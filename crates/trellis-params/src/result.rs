//! Parse result container and coerced values.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use thiserror::Error;
use trellis_core::UploadedFile;

/// A coerced value produced by argument parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    /// A JSON-shaped value: scalar, object or explicit null.
    Value(serde_json::Value),
    /// An uploaded file passed through unconverted.
    File(UploadedFile),
    /// An ordered sequence (append/split actions, multi-operator matches).
    List(Vec<ParsedValue>),
}

impl ParsedValue {
    /// A null value, used for absent defaults.
    #[must_use]
    pub fn null() -> Self {
        Self::Value(serde_json::Value::Null)
    }

    /// Returns true if this is an explicit null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(serde_json::Value::Null))
    }

    /// Returns the inner JSON value, if this is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is a JSON string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(serde_json::Value::as_str)
    }

    /// Returns the value as an integer, if it is a JSON integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(serde_json::Value::as_i64)
    }

    /// Returns the value as a float, if it is a JSON number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(serde_json::Value::as_f64)
    }

    /// Returns the value as a boolean, if it is a JSON boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(serde_json::Value::as_bool)
    }

    /// Returns the inner sequence, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[ParsedValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the inner file, if this is one.
    #[must_use]
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

impl fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(serde_json::Value::String(s)) => write!(f, "{s}"),
            Self::Value(value) => write!(f, "{value}"),
            Self::File(file) => write!(f, "{}", file.filename()),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<serde_json::Value> for ParsedValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl Serialize for ParsedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::File(file) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("filename", file.filename())?;
                map.serialize_entry("content_type", &file.content_type())?;
                map.serialize_entry("size", &file.len())?;
                map.end()
            }
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Attribute-style access to a [`ParseResult`] failed: no such field.
///
/// Distinct from the `None` a plain mapping lookup returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse result has no field '{0}'")]
pub struct MissingFieldError(pub String);

/// The structured output of one parse call.
///
/// One entry per declared argument that was found (or has
/// `store_missing` enabled), keyed by the argument's `dest` or name,
/// in declaration order. Entries are reachable both mapping-style
/// ([`get`](Self::get), returning `Option`) and attribute-style
/// ([`field`](Self::field), returning a distinct error for missing
/// fields).
///
/// # Example
///
/// ```rust
/// use trellis_params::{ParsedValue, ParseResult};
/// use serde_json::json;
///
/// let mut result = ParseResult::new();
/// result.insert("limit", ParsedValue::from(json!(10)));
///
/// assert_eq!(result.get("limit").and_then(|v| v.as_i64()), Some(10));
/// assert_eq!(result.get_i64("limit"), Some(10));
/// assert!(result.get("missing").is_none());
/// assert!(result.field("missing").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    values: IndexMap<String, ParsedValue>,
}

impl ParseResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under the given key, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, value: ParsedValue) {
        self.values.insert(key.into(), value);
    }

    /// Mapping-style lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParsedValue> {
        self.values.get(key)
    }

    /// Attribute-style lookup; a missing field is an error rather than
    /// an empty option.
    pub fn field(&self, key: &str) -> Result<&ParsedValue, MissingFieldError> {
        self.values
            .get(key)
            .ok_or_else(|| MissingFieldError(key.to_string()))
    }

    /// Returns true if the result has an entry for the key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the result has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns an iterator over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Convenience lookup of a string entry.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParsedValue::as_str)
    }

    /// Convenience lookup of an integer entry.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ParsedValue::as_i64)
    }

    /// Convenience lookup of a float entry.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParsedValue::as_f64)
    }

    /// Convenience lookup of a boolean entry.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ParsedValue::as_bool)
    }
}

impl Serialize for ParseResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_and_attribute_access() {
        let mut result = ParseResult::new();
        result.insert("name", ParsedValue::from(json!("alice")));

        assert_eq!(result.get("name").unwrap().as_str(), Some("alice"));
        assert_eq!(result.field("name").unwrap().as_str(), Some("alice"));

        assert!(result.get("missing").is_none());
        let err = result.field("missing").unwrap_err();
        assert_eq!(err, MissingFieldError("missing".to_string()));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut result = ParseResult::new();
        result.insert("b", ParsedValue::null());
        result.insert("a", ParsedValue::null());

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_typed_accessors() {
        let mut result = ParseResult::new();
        result.insert("count", ParsedValue::from(json!(3)));
        result.insert("ratio", ParsedValue::from(json!(0.5)));
        result.insert("done", ParsedValue::from(json!(true)));

        assert_eq!(result.get_i64("count"), Some(3));
        assert_eq!(result.get_f64("ratio"), Some(0.5));
        assert_eq!(result.get_bool("done"), Some(true));
        assert_eq!(result.get_str("count"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ParsedValue::from(json!("bat")).to_string(), "bat");
        assert_eq!(ParsedValue::from(json!(3)).to_string(), "3");
        let list = ParsedValue::List(vec![
            ParsedValue::from(json!("a")),
            ParsedValue::from(json!(1)),
        ]);
        assert_eq!(list.to_string(), "[a, 1]");
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut result = ParseResult::new();
        result.insert("tags", ParsedValue::List(vec![ParsedValue::from(json!("a"))]));
        result.insert("limit", ParsedValue::from(json!(5)));

        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(encoded, json!({"tags": ["a"], "limit": 5}));
    }
}
