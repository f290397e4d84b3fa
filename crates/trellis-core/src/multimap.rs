//! Ordered multi-valued mapping of raw request values.
//!
//! Every location resolves to a [`MultiMap`]; merging several locations
//! is a multi-valued union where later entries are appended after
//! earlier ones for the same key.

use crate::value::RawValue;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Number of values stored inline per key (stack allocated).
const INLINE_VALUES: usize = 1;

/// An insertion-ordered mapping from key to one or more raw values.
///
/// Keys keep their first-insertion order; values under one key keep
/// their insertion order. Most keys carry a single value, so the
/// per-key storage is a small vector.
///
/// # Example
///
/// ```rust
/// use trellis_core::{MultiMap, RawValue};
///
/// let mut map = MultiMap::new();
/// map.insert("tag", RawValue::from("a"));
/// map.insert("tag", RawValue::from("b"));
///
/// assert_eq!(map.get("tag"), Some(&RawValue::from("a")));
/// assert_eq!(map.get_all("tag").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiMap {
    inner: IndexMap<String, SmallVec<[RawValue; INLINE_VALUES]>>,
}

impl MultiMap {
    /// Creates a new empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under the given key.
    pub fn insert(&mut self, key: impl Into<String>, value: RawValue) {
        self.inner.entry(key.into()).or_default().push(value);
    }

    /// Returns the first value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.inner.get(key).and_then(|values| values.first())
    }

    /// Returns all values for a key, in insertion order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Option<&[RawValue]> {
        self.inner.get(key).map(SmallVec::as_slice)
    }

    /// Returns true if the key has at least one value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Returns an iterator over `(key, value)` pairs, yielding each
    /// value of a multi-valued key separately.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.inner
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v)))
    }

    /// Merges another map into this one as a multi-valued union: the
    /// other map's values are appended after any existing values for
    /// the same key, preserving duplicates.
    pub fn extend(&mut self, other: Self) {
        for (key, values) in other.inner {
            self.inner.entry(key).or_default().extend(values);
        }
    }
}

impl FromIterator<(String, RawValue)> for MultiMap {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
