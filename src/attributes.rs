//! Typed attribute values and the ordered attribute table
//!
//! NetCDF attributes are written in lexicographic key order so that two
//! containers built from the same input are byte-for-byte comparable. The
//! [`AttributeMap`] type owns that ordering; nothing else in the crate sorts
//! keys on its own.

use crate::errors::{GliderError, Result};
use netcdf::AttributeValue;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// A scalar or array attribute value restricted to the types the container uses.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Texts(Vec<String>),
    Byte(i8),
    Bytes(Vec<i8>),
    Short(i16),
    Shorts(Vec<i16>),
    Int(i32),
    Ints(Vec<i32>),
    Long(i64),
    Longs(Vec<i64>),
    Double(f64),
    Doubles(Vec<f64>),
}

impl AttrValue {
    /// Text content, if this is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar numeric value widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            AttrValue::Byte(v) => Some(f64::from(v)),
            AttrValue::Short(v) => Some(f64::from(v)),
            AttrValue::Int(v) => Some(f64::from(v)),
            AttrValue::Long(v) => Some(v as f64),
            AttrValue::Double(v) => Some(v),
            _ => None,
        }
    }

    /// JSON form used for feature properties. Non-finite floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        fn float(v: f64) -> JsonValue {
            Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number)
        }

        match self {
            AttrValue::Text(s) => JsonValue::String(s.clone()),
            AttrValue::Texts(v) => v.iter().cloned().map(JsonValue::String).collect(),
            AttrValue::Byte(v) => JsonValue::from(*v),
            AttrValue::Bytes(v) => v.iter().map(|x| JsonValue::from(*x)).collect(),
            AttrValue::Short(v) => JsonValue::from(*v),
            AttrValue::Shorts(v) => v.iter().map(|x| JsonValue::from(*x)).collect(),
            AttrValue::Int(v) => JsonValue::from(*v),
            AttrValue::Ints(v) => v.iter().map(|x| JsonValue::from(*x)).collect(),
            AttrValue::Long(v) => JsonValue::from(*v),
            AttrValue::Longs(v) => v.iter().map(|x| JsonValue::from(*x)).collect(),
            AttrValue::Double(v) => float(*v),
            AttrValue::Doubles(v) => v.iter().map(|x| float(*x)).collect(),
        }
    }

    /// Build an attribute from a JSON override value.
    ///
    /// Strings map to text, integers to 32-bit ints when they fit (64-bit
    /// otherwise), other numbers to doubles. Homogeneous arrays map to the
    /// corresponding array variant.
    pub fn from_json(key: &str, value: &JsonValue) -> Result<Self> {
        let invalid = || {
            GliderError::InvalidConfig(format!(
                "attribute '{}' has unsupported value {}",
                key, value
            ))
        };

        match value {
            JsonValue::String(s) => Ok(AttrValue::Text(s.clone())),
            JsonValue::Bool(b) => Ok(AttrValue::Text(b.to_string())),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i32::try_from(i).map_or(AttrValue::Long(i), AttrValue::Int))
                } else {
                    n.as_f64().map(AttrValue::Double).ok_or_else(invalid)
                }
            }
            JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => Ok(
                AttrValue::Texts(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                ),
            ),
            JsonValue::Array(items) if items.iter().all(|v| v.is_i64()) => Ok(AttrValue::Longs(
                items.iter().filter_map(JsonValue::as_i64).collect(),
            )),
            JsonValue::Array(items) if items.iter().all(JsonValue::is_number) => Ok(
                AttrValue::Doubles(items.iter().filter_map(JsonValue::as_f64).collect()),
            ),
            _ => Err(invalid()),
        }
    }

    /// Convert a stored NetCDF attribute. Unsigned and 32-bit float values are
    /// widened; types the container never writes yield `None`.
    pub fn from_netcdf(value: AttributeValue) -> Option<Self> {
        let converted = match value {
            AttributeValue::Str(s) => AttrValue::Text(s),
            AttributeValue::Strs(v) => AttrValue::Texts(v),
            AttributeValue::Schar(v) => AttrValue::Byte(v),
            AttributeValue::Schars(v) => AttrValue::Bytes(v),
            AttributeValue::Uchar(v) => AttrValue::Short(i16::from(v)),
            AttributeValue::Short(v) => AttrValue::Short(v),
            AttributeValue::Shorts(v) => AttrValue::Shorts(v),
            AttributeValue::Ushort(v) => AttrValue::Int(i32::from(v)),
            AttributeValue::Int(v) => AttrValue::Int(v),
            AttributeValue::Ints(v) => AttrValue::Ints(v),
            AttributeValue::Uint(v) => AttrValue::Long(i64::from(v)),
            AttributeValue::Longlong(v) => AttrValue::Long(v),
            AttributeValue::Longlongs(v) => AttrValue::Longs(v),
            AttributeValue::Float(v) => AttrValue::Double(f64::from(v)),
            AttributeValue::Floats(v) => AttrValue::Doubles(v.into_iter().map(f64::from).collect()),
            AttributeValue::Double(v) => AttrValue::Double(v),
            AttributeValue::Doubles(v) => AttrValue::Doubles(v),
            _ => return None,
        };
        Some(converted)
    }
}

impl From<&AttrValue> for AttributeValue {
    fn from(value: &AttrValue) -> Self {
        match value {
            AttrValue::Text(s) => AttributeValue::Str(s.clone()),
            AttrValue::Texts(v) => AttributeValue::Strs(v.clone()),
            AttrValue::Byte(v) => AttributeValue::Schar(*v),
            AttrValue::Bytes(v) => AttributeValue::Schars(v.clone()),
            AttrValue::Short(v) => AttributeValue::Short(*v),
            AttrValue::Shorts(v) => AttributeValue::Shorts(v.clone()),
            AttrValue::Int(v) => AttributeValue::Int(*v),
            AttrValue::Ints(v) => AttributeValue::Ints(v.clone()),
            AttrValue::Long(v) => AttributeValue::Longlong(*v),
            AttrValue::Longs(v) => AttributeValue::Longlongs(v.clone()),
            AttrValue::Double(v) => AttributeValue::Double(*v),
            AttrValue::Doubles(v) => AttributeValue::Doubles(v.clone()),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "\"{}\"", s),
            AttrValue::Texts(v) => write!(f, "{:?}", v),
            AttrValue::Byte(v) => write!(f, "{}b", v),
            AttrValue::Bytes(v) => write!(f, "{:?}", v),
            AttrValue::Short(v) => write!(f, "{}s", v),
            AttrValue::Shorts(v) => write!(f, "{:?}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Ints(v) => write!(f, "{:?}", v),
            AttrValue::Long(v) => write!(f, "{}L", v),
            AttrValue::Longs(v) => write!(f, "{:?}", v),
            AttrValue::Double(v) => write!(f, "{}", v),
            AttrValue::Doubles(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Double(value)
    }
}

impl From<i8> for AttrValue {
    fn from(value: i8) -> Self {
        AttrValue::Byte(value)
    }
}

impl From<i16> for AttrValue {
    fn from(value: i16) -> Self {
        AttrValue::Short(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value)
    }
}

impl From<Vec<i8>> for AttrValue {
    fn from(value: Vec<i8>) -> Self {
        AttrValue::Bytes(value)
    }
}

/// Attribute table iterated in lexicographic key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    entries: BTreeMap<String, AttrValue>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Insert only when the key is not already present. Returns true if inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> bool {
        match self.entries.entry(key.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Merge `overrides` into this table. On key collision the override wins.
    pub fn merge(&mut self, overrides: &AttributeMap) {
        for (key, value) in overrides {
            self.entries.insert(key.to_string(), value.clone());
        }
    }

    /// A copy of this table with `overrides` merged on top.
    pub fn merged(&self, overrides: &AttributeMap) -> AttributeMap {
        let mut out = self.clone();
        out.merge(overrides);
        out
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttrValue::as_f64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in lexicographic key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// JSON object with the same key order.
    pub fn to_json_map(&self) -> Map<String, JsonValue> {
        self.iter()
            .map(|(key, value)| (key.to_string(), value.to_json()))
            .collect()
    }
}

/// Ordered iterator over an [`AttributeMap`].
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, AttrValue>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a AttrValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = (&'a str, &'a AttrValue);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
