// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event attributes and their wire representation.
//!
//! An event goes over the wire as one flat JSON object:
//!
//! ```json
//! {"eventType":"login","timestamp":1690000000,"user":"alice"}
//! ```
//!
//! `eventType` and `timestamp` are injected in front of the caller's attributes.
//! A caller attribute with one of those names replaces the injected value in place,
//! so an object never carries a key twice.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::constants::{EVENT_TYPE_KEY, TIMESTAMP_KEY};

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Attributes of one event, in insertion order.
///
/// Keys are unique: inserting an existing key replaces its value and keeps
/// its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attribute, returning the value it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut AttributeValue> {
        self.entries.iter_mut().map(|(_, value)| value)
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = (String, AttributeValue);
    type IntoIter = std::vec::IntoIter<(String, AttributeValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One event as it is written to the wire.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    name: &'a str,
    timestamp: u64,
    attributes: &'a Attributes,
}

impl<'a> Event<'a> {
    #[must_use]
    pub fn new(name: &'a str, timestamp: u64, attributes: &'a Attributes) -> Self {
        Self {
            name,
            timestamp,
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Serializes the event into its JSON object form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for Event<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let injected = [EVENT_TYPE_KEY, TIMESTAMP_KEY]
            .iter()
            .filter(|key| self.attributes.get(key).is_none())
            .count();
        let mut map = serializer.serialize_map(Some(self.attributes.len() + injected))?;

        match self.attributes.get(EVENT_TYPE_KEY) {
            Some(value) => map.serialize_entry(EVENT_TYPE_KEY, value)?,
            None => map.serialize_entry(EVENT_TYPE_KEY, self.name)?,
        }
        match self.attributes.get(TIMESTAMP_KEY) {
            Some(value) => map.serialize_entry(TIMESTAMP_KEY, value)?,
            None => map.serialize_entry(TIMESTAMP_KEY, &self.timestamp)?,
        }
        for (key, value) in self.attributes.iter() {
            if key == EVENT_TYPE_KEY || key == TIMESTAMP_KEY {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
