//! Caller-supplied field sets for create and update calls.

use std::collections::BTreeMap;
use std::collections::btree_map;

use super::field::FieldValue;
use crate::types::Visibility;

/// An ordered set of named field values.
///
/// This is what `create` and `update` take in place of keyword arguments.
/// Keys are local field names; keys a schema does not declare are sent
/// through unchanged.
///
/// ```
/// use kanka_core::Fields;
///
/// let fields = Fields::new()
///     .set("name", "Aria")
///     .set("is_private", true)
///     .set("tags", vec![3_i64, 4]);
/// assert_eq!(fields.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    /// An empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `visibility_id`, or leaves it out for [`Visibility::Inherit`].
    pub fn set_visibility(mut self, visibility: Visibility) -> Self {
        match visibility.id() {
            Some(id) => self.insert("visibility_id", id),
            None => {
                self.remove("visibility_id");
            }
        }
        self
    }

    /// Adds or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a field value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Returns a string field value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Removes a field.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    /// Returns true if the field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
