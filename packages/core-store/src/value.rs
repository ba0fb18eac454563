//! The StorageValue type - a contract storage tree.
//!
//! A snapshot of contract storage is a tree of scalars, plain objects, and
//! two kinds of maps. Plain objects and arrays are navigated by path; maps
//! are navigated by key through `KeyedContainer`.

use bigdecimal::num_bigint::BigInt;
use indexmap::IndexMap;

use crate::{BigMapHandle, FieldPath, InMemoryMap, KeyedContainer};

/// A node of a contract storage tree.
///
/// # Design Notes
///
/// - `Object` uses `IndexMap` so fields keep the order the contract declared them in
/// - `BigInt` holds arbitrary-precision integers as stored on chain; they are only
///   narrowed to JSON numbers during normalization
/// - `BigMap` holds a handle, never the entries themselves
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StorageValue {
    #[default]
    Null,
    Bool(bool),
    /// A number that already fits a JSON number.
    Number(serde_json::Number),
    /// An arbitrary-precision integer.
    BigInt(BigInt),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<StorageValue>),
    Object(IndexMap<String, StorageValue>),
    /// A map held entirely in the snapshot.
    Map(InMemoryMap),
    /// A map only referenced by pointer.
    BigMap(BigMapHandle),
}

impl StorageValue {
    /// Build an object from `(field, value)` pairs, keeping their order.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, StorageValue)>,
    {
        StorageValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StorageValue::Null)
    }

    /// Whether this value is a map or a big map.
    pub fn is_container(&self) -> bool {
        self.as_container().is_some()
    }

    /// View this value as something that can be looked into by key.
    ///
    /// This is the only place where the kind of a map matters; everything
    /// downstream talks to `KeyedContainer`.
    pub fn as_container(&self) -> Option<&dyn KeyedContainer> {
        match self {
            StorageValue::Map(map) => Some(map),
            StorageValue::BigMap(handle) => Some(handle),
            _ => None,
        }
    }

    /// A direct field of an object.
    pub fn field(&self, name: &str) -> Option<&StorageValue> {
        match self {
            StorageValue::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Get a nested value by path.
    ///
    /// A field whose name is the whole dotted path wins over descending
    /// component by component.
    ///
    /// Returns `None` if the path doesn't exist or can't be navigated
    /// (e.g., trying to index into a string, or into a map).
    pub fn get(&self, path: &FieldPath) -> Option<&StorageValue> {
        if path.len() > 1 {
            if let Some(direct) = self.field(path.as_str()) {
                return Some(direct);
            }
        }

        let mut current = self;
        for component in path.iter() {
            current = match current {
                StorageValue::Object(fields) => fields.get(component.as_str())?,
                StorageValue::Array(items) => {
                    let index: usize = component.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Short name of the value's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageValue::Null => "null",
            StorageValue::Bool(_) => "bool",
            StorageValue::Number(_) => "number",
            StorageValue::BigInt(_) => "big_int",
            StorageValue::String(_) => "string",
            StorageValue::Bytes(_) => "bytes",
            StorageValue::Array(_) => "array",
            StorageValue::Object(_) => "object",
            StorageValue::Map(_) => "map",
            StorageValue::BigMap(_) => "big_map",
        }
    }
}

// Conversion from common types

impl From<bool> for StorageValue {
    fn from(v: bool) -> Self {
        StorageValue::Bool(v)
    }
}

impl From<i64> for StorageValue {
    fn from(v: i64) -> Self {
        StorageValue::Number(v.into())
    }
}

impl From<i32> for StorageValue {
    fn from(v: i32) -> Self {
        StorageValue::Number(v.into())
    }
}

impl From<u64> for StorageValue {
    fn from(v: u64) -> Self {
        StorageValue::Number(v.into())
    }
}

impl From<BigInt> for StorageValue {
    fn from(v: BigInt) -> Self {
        StorageValue::BigInt(v)
    }
}

impl From<String> for StorageValue {
    fn from(v: String) -> Self {
        StorageValue::String(v)
    }
}

impl From<&str> for StorageValue {
    fn from(v: &str) -> Self {
        StorageValue::String(v.to_string())
    }
}

impl From<InMemoryMap> for StorageValue {
    fn from(v: InMemoryMap) -> Self {
        StorageValue::Map(v)
    }
}

impl From<BigMapHandle> for StorageValue {
    fn from(v: BigMapHandle) -> Self {
        StorageValue::BigMap(v)
    }
}

impl<T: Into<StorageValue>> From<Vec<T>> for StorageValue {
    fn from(v: Vec<T>) -> Self {
        StorageValue::Array(v.into_iter().map(Into::into).collect())
    }
}
