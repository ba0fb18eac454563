//! Keys used to look values up in maps and big maps.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A key into a contract map.
///
/// Contracts key their maps either by a single scalar (string, number,
/// boolean) or by a record of scalars. Both shapes are accepted here.
///
/// Equality follows the way a map of a given key type would see the key, not
/// the JSON shape the caller typed:
/// - scalars compare by their text form, so `5` and `"5"` are the same key
/// - composite keys compare field by field, regardless of field order
/// - a scalar never equals a composite key
///
/// `Hash` is consistent with that equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapKey {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Composite(IndexMap<String, MapKey>),
}

impl MapKey {
    /// Build a composite key from `(field, key)` pairs.
    pub fn composite<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, MapKey)>,
    {
        MapKey::Composite(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, MapKey::Composite(_))
    }

    /// The text form of the key. Scalars compare by it; composite keys render
    /// as JSON with sorted field names.
    pub fn canonical(&self) -> String {
        match self {
            MapKey::Bool(b) => b.to_string(),
            MapKey::Number(n) => n.to_string(),
            MapKey::String(s) => s.clone(),
            MapKey::Composite(fields) => {
                let sorted: BTreeMap<&str, String> = fields
                    .iter()
                    .map(|(name, key)| (name.as_str(), key.canonical()))
                    .collect();
                // A map of strings always serializes.
                serde_json::to_string(&sorted).unwrap_or_default()
            }
        }
    }

    /// The text used when the key has to travel in a request path.
    ///
    /// Scalars are sent as-is, composite keys as compact JSON in the order the
    /// caller declared their fields.
    pub fn to_request_text(&self) -> String {
        match self {
            MapKey::Composite(_) => serde_json::to_string(self).unwrap_or_default(),
            scalar => scalar.canonical(),
        }
    }

    /// The key as it appears in projection output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MapKey::Bool(b) => serde_json::Value::Bool(*b),
            MapKey::Number(n) => serde_json::Value::Number(n.clone()),
            MapKey::String(s) => serde_json::Value::String(s.clone()),
            MapKey::Composite(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, key)| (name.clone(), key.to_json()))
                    .collect(),
            ),
        }
    }

    /// Interpret a plain JSON value as a key.
    ///
    /// Returns `None` for `null` and for arrays, which no map is keyed by.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Bool(b) => Some(MapKey::Bool(*b)),
            serde_json::Value::Number(n) => Some(MapKey::Number(n.clone())),
            serde_json::Value::String(s) => Some(MapKey::String(s.clone())),
            serde_json::Value::Object(fields) => {
                let mut composite = IndexMap::with_capacity(fields.len());
                for (name, value) in fields {
                    composite.insert(name.clone(), MapKey::from_json(value)?);
                }
                Some(MapKey::Composite(composite))
            }
            serde_json::Value::Null | serde_json::Value::Array(_) => None,
        }
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MapKey::Composite(a), MapKey::Composite(b)) => {
                a.len() == b.len() && a.iter().all(|(name, key)| b.get(name) == Some(key))
            }
            // A scalar never equals a composite, whatever its text says.
            (MapKey::Composite(_), _) | (_, MapKey::Composite(_)) => false,
            _ => self.canonical() == other.canonical(),
        }
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            MapKey::Composite(fields) => {
                state.write_u8(1);
                let sorted: BTreeMap<&str, &MapKey> = fields
                    .iter()
                    .map(|(name, key)| (name.as_str(), key))
                    .collect();
                for (name, key) in sorted {
                    name.hash(state);
                    key.hash(state);
                }
            }
            scalar => {
                state.write_u8(0);
                scalar.canonical().hash(state);
            }
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::String(v.to_string())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        MapKey::String(v)
    }
}

impl From<bool> for MapKey {
    fn from(v: bool) -> Self {
        MapKey::Bool(v)
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        MapKey::Number(v.into())
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        MapKey::Number(v.into())
    }
}
