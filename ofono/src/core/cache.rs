//! Last-known property values for one bound object.

use std::collections::BTreeMap;

use crate::api::models::PropertyValue;

/// Property name to last-known value for one (path, interface) pair.
///
/// Holds only values that were fetched or pushed by a change notification
/// since the last [`clear`](Self::clear). A missing key means the value is
/// unknown, never that it is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyCache {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Returns a snapshot of every cached value.
    pub fn get_all(&self) -> BTreeMap<String, PropertyValue> {
        self.values.clone()
    }

    pub fn put(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    /// Replaces the whole cache with `values`.
    pub fn replace(&mut self, values: BTreeMap<String, PropertyValue>) {
        self.values = values;
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
