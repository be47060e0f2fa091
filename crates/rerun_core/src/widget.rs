use std::borrow::Borrow;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WidgetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for WidgetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-known value of a single widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Button-like widgets; `true` only for the run the click triggered.
    Trigger(bool),
    TextList(Vec<String>),
}

/// Snapshot of widget values carried from one run to the next.
///
/// Keyed by [`WidgetId`] in a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetStates {
    values: BTreeMap<WidgetId, WidgetValue>,
}

impl WidgetStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: impl Into<WidgetId>, value: WidgetValue) -> Self {
        self.insert(id, value);
        self
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&mut self, id: impl Into<WidgetId>, value: WidgetValue) -> Option<WidgetValue> {
        self.values.insert(id.into(), value)
    }

    pub fn get(&self, id: &str) -> Option<&WidgetValue> {
        self.values.get(id)
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.values.contains_key(id)
    }

    /// Sets every `Trigger(true)` back to `Trigger(false)`.
    pub fn reset_triggers(&mut self) {
        for value in self.values.values_mut() {
            if let WidgetValue::Trigger(fired) = value {
                *fired = false;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, WidgetId, WidgetValue> {
        self.values.iter()
    }
}

impl<K: Into<WidgetId>> FromIterator<(K, WidgetValue)> for WidgetStates {
    fn from_iter<I: IntoIterator<Item = (K, WidgetValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(id, value)| (id.into(), value)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a WidgetStates {
    type Item = (&'a WidgetId, &'a WidgetValue);
    type IntoIter = btree_map::Iter<'a, WidgetId, WidgetValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for WidgetStates {
    type Item = (WidgetId, WidgetValue);
    type IntoIter = btree_map::IntoIter<WidgetId, WidgetValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
